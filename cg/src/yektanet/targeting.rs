//! Targeting label tables
//!
//! The planner emits Persian content-category and audience-segment labels;
//! the Yektanet API wants IAB category codes and numeric segment ids.
//! Labels the tables don't know are dropped rather than rejected, so a
//! creative planner cannot wedge publication.

/// Persian content category label to IAB category code
pub const CATEGORY_MAP: &[(&str, &str)] = &[
    ("بیماری و درمان", "IAB287"),
    ("جراحی و خدمات زیبایی", "IAB323"),
    ("سبک زندگی سالم", "IAB223"),
    ("جشن‌ها و مراسمات", "IAB163"),
    ("موضوعات حساس", "IAB2004"),
    ("تخفیف و قرعه‌کشی", "IAB473"),
    ("مراقبت زیبایی و بهداشت فردی", "IAB553"),
    ("مد و پوشاک", "IAB552"),
    ("ورزش", "IAB483"),
    ("خودرو", "IAB1"),
    ("املاک", "IAB441"),
    ("مدرسه و کنکور سراسری", "IAB132"),
    ("کسب و کار", "IAB53"),
    ("اقتصاد", "IAB80"),
    ("صنعت و کشاورزی", "IAB90"),
    ("سرمایه شخصی", "IAB391"),
    ("تکنولوژی", "IAB596"),
    ("تجهیزات الکترونیک شخصی", "IAB632"),
    ("بازی ویدیویی", "IAB680"),
    ("کتاب و ادبیات", "IAB42"),
    ("خدمات", "IAB2003"),
    ("سرگرمی و مهارت و هنر", "IAB239"),
    ("مذهب", "IAB453"),
    ("علم و دانش", "IAB464"),
    ("تفریح", "IAB150"),
    ("سفر و گردشگری", "IAB653"),
    ("سینما و تلویزیون و تئاتر", "IAB324"),
    ("موسیقی", "IAB338"),
    ("عامه پسند", "IAB432"),
    ("خانواده", "IAB186"),
    ("روابط عاطفی", "IAB188"),
    ("والدین", "IAB192"),
    ("لوازم و تجهیزات خانه", "IAB274"),
    ("ساخت و ساز و تغییر دکوراسیون", "IAB276"),
    ("غذا و نوشیدنی", "IAB210"),
    ("حیوانات خانگی", "IAB422"),
    ("زبان آموزی", "IAB147"),
    ("رمز ارز", "IAB2001"),
    ("دانشگاه و تحصیلات عالی", "IAB137"),
    ("اشتغال", "IAB123"),
    ("مهاجرت", "IAB2002"),
    ("حقوق", "IAB383"),
    ("سیاست", "IAB386"),
    ("اجتماعی", "IAB380"),
];

/// Persian audience segment label to platform segment id
pub const SEGMENT_MAP: &[(&str, i64)] = &[
    ("سفر و گردشگری", 28),
    ("خدمات", 51),
    ("مذهب", 30),
    ("مدرسه و کنکور سراسری", 26),
    ("املاک", 44),
    ("غذا و نوشیدنی", 9),
    ("ساخت و ساز و تغییر دکوراسیون", 55),
    ("سرگرمی و مهارت و هنر", 56),
    ("دانشگاه و تحصیلات عالی", 53),
    ("لوازم و تجهیزات خانه", 61),
    ("تفریح", 48),
    ("صنعت و کشاورزی", 58),
    ("مراقبت زیبایی و بهداشت فردی", 62),
    ("کسب و کار", 60),
    ("بازی ویدیویی", 45),
    ("سینما و تلویزیون و تئاتر", 57),
    ("سرمایه شخصی", 18),
    ("جراحی و خدمات زیبایی", 49),
    ("اشتغال", 42),
    ("سبک زندگی سالم", 7),
    ("کتاب و ادبیات", 59),
    ("والدین", 11),
    ("خودرو", 52),
    ("زبان آموزی", 54),
    ("مد و پوشاک", 15),
    ("تجهیزات الکترونیک شخصی", 46),
    ("مهاجرت", 29),
    ("تخفیف و قرعه‌کشی", 47),
    ("تکنولوژی", 19),
    ("جشن‌ها و مراسمات", 50),
    ("اقتصاد", 43),
];

/// Look up the IAB code for a category label
pub fn category_code(label: &str) -> Option<&'static str> {
    CATEGORY_MAP.iter().find(|(l, _)| *l == label).map(|(_, code)| *code)
}

/// Look up the segment id for a segment label
pub fn segment_id(label: &str) -> Option<i64> {
    SEGMENT_MAP.iter().find(|(l, _)| *l == label).map(|(_, id)| *id)
}

/// Map known category labels to IAB codes, dropping unknown labels
pub fn resolve_categories(labels: &[String]) -> Vec<&'static str> {
    labels.iter().filter_map(|l| category_code(l)).collect()
}

/// Map known segment labels to ids, dropping unknown labels
pub fn resolve_segments(labels: &[String]) -> Vec<i64> {
    labels.iter().filter_map(|l| segment_id(l)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_lookup() {
        assert_eq!(category_code("غذا و نوشیدنی"), Some("IAB210"));
        assert_eq!(category_code("ورزش"), Some("IAB483"));
        assert_eq!(category_code("nonexistent"), None);
    }

    #[test]
    fn test_segment_lookup() {
        assert_eq!(segment_id("غذا و نوشیدنی"), Some(9));
        assert_eq!(segment_id("تکنولوژی"), Some(19));
        assert_eq!(segment_id("ورزش"), None);
    }

    #[test]
    fn test_unknown_labels_dropped() {
        let labels = vec![
            "غذا و نوشیدنی".to_string(),
            "made up label".to_string(),
            "خودرو".to_string(),
        ];
        assert_eq!(resolve_categories(&labels), vec!["IAB210", "IAB1"]);
        assert_eq!(resolve_segments(&labels), vec![9, 52]);
    }

    #[test]
    fn test_no_duplicate_labels() {
        for (i, (label, _)) in CATEGORY_MAP.iter().enumerate() {
            assert!(
                !CATEGORY_MAP[i + 1..].iter().any(|(l, _)| l == label),
                "duplicate category label: {}",
                label
            );
        }
        for (i, (label, _)) in SEGMENT_MAP.iter().enumerate() {
            assert!(
                !SEGMENT_MAP[i + 1..].iter().any(|(l, _)| l == label),
                "duplicate segment label: {}",
                label
            );
        }
    }
}
