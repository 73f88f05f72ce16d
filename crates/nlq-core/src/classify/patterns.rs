//! Classification pattern tables
//!
//! All regex lists, vocabularies and scoring constants used by the intent
//! classifier. These are versioned configuration data, not engine logic:
//! they compile once at first use and can be tested independently of the
//! classifier itself.

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{EntityCategory, QueryType};

// ---------------------------------------------------------------------------
// Scoring constants (tunable)
// ---------------------------------------------------------------------------

/// Unnormalized bonus added to a type's score when one of its morphological
/// cues is observed. Applied at most once per type.
pub const MORPH_BONUS: f64 = 0.5;

/// Confidence assigned when no pattern matches at all.
pub const DEFAULT_CONFIDENCE: f64 = 0.1;

/// Per-morpheme contribution to the complexity score, capped at
/// [`MORPHEME_CAP`].
pub const MORPHEME_WEIGHT: f64 = 0.03;
pub const MORPHEME_CAP: f64 = 0.3;

/// Per-entity contribution to the complexity score, capped at [`ENTITY_CAP`].
pub const ENTITY_WEIGHT: f64 = 0.1;
pub const ENTITY_CAP: f64 = 0.3;

/// Per-conjunction contribution, capped at [`CONJUNCTION_CAP`].
pub const CONJUNCTION_WEIGHT: f64 = 0.1;
pub const CONJUNCTION_CAP: f64 = 0.2;

/// Discourse connectives that raise complexity.
pub static SPECIAL_CONJUNCTIONS: &[&str] = &["그리고", "또는", "하지만", "포함", "제외", "조건"];

/// Action vocabulary for intent keyword extraction.
pub static INTENT_VOCABULARY: &[&str] = &[
    "조회", "검색", "가입", "탈퇴", "등록", "삭제", "수정", "상담", "문의", "구매", "변경", "확인",
];

/// Words that look like names to the customer-name regex but are generic
/// role nouns, never actual customer names.
pub static NAME_STOPWORDS: &[&str] = &["고객", "회원", "사용자", "담당자", "선생"];

// ---------------------------------------------------------------------------
// Query-type scoring patterns
// ---------------------------------------------------------------------------

fn compile_all(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|s| Regex::new(s).expect("classification pattern"))
        .collect()
}

static SIMPLE_QUERY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        "보여줘", "알려줘", "조회", "목록", "리스트", "전체", "모두", "확인",
    ])
});

static FILTERING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        "찾아",
        "검색",
        "필터",
        "조건",
        "이상",
        "이하",
        "초과",
        "미만",
        r"\d+대",
        "중에서",
    ])
});

static AGGREGATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        r"몇\s*명",
        r"몇\s*개",
        "개수",
        "인원",
        "합계",
        "평균",
        "통계",
        "집계",
        "최대",
        "최소",
    ])
});

static JOIN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        "함께",
        "같이",
        "관련",
        "연관",
        "비교",
        r"[가-힣]+별로?",
        "각각",
        "와의",
        "과의",
        "메모와",
        "이벤트와",
    ])
});

/// Scoring patterns for a query type.
pub fn type_patterns(query_type: QueryType) -> &'static [Regex] {
    match query_type {
        QueryType::SimpleQuery => &SIMPLE_QUERY_PATTERNS,
        QueryType::Filtering => &FILTERING_PATTERNS,
        QueryType::Aggregation => &AGGREGATION_PATTERNS,
        QueryType::Join => &JOIN_PATTERNS,
    }
}

/// Morphological cues per query type: (surface form, POS-tag prefix).
///
/// Matching any one cue adds [`MORPH_BONUS`] to that type's score. The
/// pairs are ad hoc calibration data - tune freely.
pub fn morph_cues(query_type: QueryType) -> &'static [(&'static str, &'static str)] {
    match query_type {
        QueryType::SimpleQuery => &[],
        QueryType::Filtering => &[("이상", "N"), ("미만", "N"), ("조건", "N")],
        QueryType::Aggregation => &[("명", "N"), ("개", "N"), ("수", "N")],
        QueryType::Join => &[("와", "J"), ("과", "J"), ("보다", "J"), ("별", "X")],
    }
}

// ---------------------------------------------------------------------------
// Entity extraction patterns
// ---------------------------------------------------------------------------

static CUSTOMER_NAME_PATTERNS: Lazy<Vec<Regex>> =
    Lazy::new(|| compile_all(&[r"([가-힣]{2,4})\s*(?:님|씨)", r"([가-힣]{2,4})\s*고객님"]));

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        r"\d{4}년",
        r"\d{1,2}월",
        r"\d{1,2}일",
        r"오늘|어제|내일",
        r"이번\s*주|지난\s*주|이번\s*달|지난\s*달",
        r"올해|작년",
        r"최근\s*\d+\s*일",
    ])
});

static PRODUCT_NAME_PATTERNS: Lazy<Vec<Regex>> =
    Lazy::new(|| compile_all(&[r"([가-힣A-Za-z0-9]+)\s*(?:요금제|플랜|상품|제품)"]));

static AMOUNT_PATTERNS: Lazy<Vec<Regex>> =
    Lazy::new(|| compile_all(&[r"\d[\d,]*\s*(?:만\s*원|원|억|달러)"]));

static LOCATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        "서울|부산|대구|인천|광주|대전|울산|세종|제주",
        "경기|강원|충북|충남|전북|전남|경북|경남",
        r"[가-힣]{1,4}(?:특별시|광역시)",
    ])
});

static KEYWORD_PATTERNS: Lazy<Vec<Regex>> =
    Lazy::new(|| compile_all(&[r#""([^"]+)""#, r"'([^']+)'"]));

/// Extraction patterns for an entity category.
///
/// When a pattern has a capture group, group 1 is the extracted value;
/// otherwise the whole match is used.
pub fn entity_patterns(category: EntityCategory) -> &'static [Regex] {
    match category {
        EntityCategory::CustomerName => &CUSTOMER_NAME_PATTERNS,
        EntityCategory::Date => &DATE_PATTERNS,
        EntityCategory::ProductName => &PRODUCT_NAME_PATTERNS,
        EntityCategory::Amount => &AMOUNT_PATTERNS,
        EntityCategory::Location => &LOCATION_PATTERNS,
        EntityCategory::Keyword => &KEYWORD_PATTERNS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_type_patterns_compile() {
        for t in QueryType::ALL {
            assert!(!type_patterns(t).is_empty());
        }
    }

    #[test]
    fn test_all_entity_patterns_compile() {
        for c in EntityCategory::ALL {
            assert!(!entity_patterns(c).is_empty());
        }
    }

    #[test]
    fn test_filtering_matches_age_band() {
        let hit = type_patterns(QueryType::Filtering)
            .iter()
            .any(|re| re.is_match("30대 고객들을 찾아줘"));
        assert!(hit);
    }

    #[test]
    fn test_simple_does_not_match_filtering_query() {
        let hits = type_patterns(QueryType::SimpleQuery)
            .iter()
            .filter(|re| re.is_match("30대 고객들을 찾아줘"))
            .count();
        assert_eq!(hits, 0);
    }

    #[test]
    fn test_date_pattern_matches_relative_dates() {
        let text = "지난 주 가입한 고객";
        let hit = entity_patterns(EntityCategory::Date)
            .iter()
            .any(|re| re.is_match(text));
        assert!(hit);
    }

    #[test]
    fn test_customer_name_capture() {
        let caps = CUSTOMER_NAME_PATTERNS[0].captures("김민수님 메모 보여줘").unwrap();
        assert_eq!(&caps[1], "김민수");
    }

    #[test]
    fn test_keyword_quoted_phrase() {
        let caps = KEYWORD_PATTERNS[0].captures(r#""요금 문의" 메모"#).unwrap();
        assert_eq!(&caps[1], "요금 문의");
    }
}
