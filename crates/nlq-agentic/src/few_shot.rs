//! Few-shot examples for the SQL generation prompt
//!
//! A small fixed set of Korean question → SQL pairs, ordered from simple
//! lookups to a join, that anchors the model's output format.

/// One worked example embedded in the user prompt.
#[derive(Debug, Clone, Copy)]
pub struct FewShotExample {
    pub question: &'static str,
    pub sql: &'static str,
    pub explanation: &'static str,
    /// 1 (trivial lookup) to 5 (multi-table aggregation).
    pub complexity: u8,
}

pub const EXAMPLES: &[FewShotExample] = &[
    FewShotExample {
        question: "전체 고객 목록 보여줘",
        sql: "SELECT * FROM customers LIMIT 100",
        explanation: "전체 고객 목록을 조회합니다 (최대 100건).",
        complexity: 1,
    },
    FewShotExample {
        question: "김철수님 정보 찾아줘",
        sql: "SELECT * FROM customers WHERE name = :customer_name LIMIT 100",
        explanation: "이름이 일치하는 고객을 조회합니다.",
        complexity: 2,
    },
    FewShotExample {
        question: "월 요금 5만원 이상인 고객 검색해줘",
        sql: "SELECT * FROM customers WHERE monthly_fee >= :amount LIMIT 100",
        explanation: "월 요금이 기준 금액 이상인 고객을 조회합니다.",
        complexity: 2,
    },
    FewShotExample {
        question: "상품별 고객 수를 알려줘",
        sql: "SELECT product, COUNT(*) AS cnt FROM customers GROUP BY product",
        explanation: "상품별로 고객 수를 집계합니다.",
        complexity: 3,
    },
    FewShotExample {
        question: "고객과 메모를 함께 보여줘",
        sql: "SELECT customers.id, customers.name, memos.content, memos.created_at \
              FROM customers LEFT JOIN memos ON customers.id = memos.customer_id LIMIT 100",
        explanation: "고객과 해당 고객의 메모를 함께 조회합니다.",
        complexity: 5,
    },
];

/// Render the examples as a prompt section.
pub fn render() -> String {
    let mut out = String::from("## 예시\n\n");
    for (i, ex) in EXAMPLES.iter().enumerate() {
        out.push_str(&format!(
            "### 예시 {} (복잡도 {})\n질문: {}\nSQL: {}\n설명: {}\n\n",
            i + 1,
            ex.complexity,
            ex.question,
            ex.sql,
            ex.explanation
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_examples_ordered_by_complexity() {
        for pair in EXAMPLES.windows(2) {
            assert!(pair[0].complexity <= pair[1].complexity);
        }
    }

    #[test]
    fn test_examples_are_select_only() {
        for ex in EXAMPLES {
            assert!(ex.sql.trim_start().to_uppercase().starts_with("SELECT"));
        }
    }

    #[test]
    fn test_render_includes_all_examples() {
        let rendered = render();
        for ex in EXAMPLES {
            assert!(rendered.contains(ex.question));
            assert!(rendered.contains(ex.sql));
        }
    }
}
