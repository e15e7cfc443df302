use clinic_referrals::workflows::matching::{
    clinic_similarity, levenshtein_distance, name_similarity, normalize_name,
};

const SAMPLES: &[&str] = &[
    "",
    "  ",
    "Иванов Иван",
    "  ИВАНОВ   иван  ",
    "Семёнов Пётр Алексеевич",
    "\u{feff}Смирнова\u{200b} Анна",
    "ООО «Клиника Мечта»",
    "O'Neil   Mary-Jane",
];

#[test]
fn normalization_is_idempotent() {
    for sample in SAMPLES {
        let once = normalize_name(sample);
        assert_eq!(normalize_name(&once), once, "not idempotent for {sample:?}");
    }
}

#[test]
fn identical_names_score_full_marks() {
    for sample in SAMPLES {
        if normalize_name(sample).is_empty() {
            continue;
        }
        assert_eq!(name_similarity(sample, sample), 100, "self match for {sample:?}");
    }
    assert_eq!(name_similarity("Семёнов Пётр", "семенов петр"), 100);
}

#[test]
fn token_order_does_not_matter() {
    assert!(name_similarity("Иванов Иван", "Иван Иванов") >= 90);
    assert!(name_similarity("Иванов Иван", "Иван Иванович Иванов") >= 60);
}

#[test]
fn dissimilar_names_score_low() {
    assert!(name_similarity("Иванов Иван", "Петров Пётр") < 30);
    assert_eq!(name_similarity("Иванов", ""), 0);
}

#[test]
fn clinic_names_ignore_legal_form() {
    assert!(clinic_similarity("ООО «Клиника Мечта»", "Мечта") >= 90);
    assert_eq!(clinic_similarity("\"Мечта\"", "клиника Мечта"), 100);
    assert_eq!(clinic_similarity("", "Мечта"), 0);
}

#[test]
fn levenshtein_is_a_symmetric_distance() {
    for a in SAMPLES {
        assert_eq!(levenshtein_distance(a, a), 0);
        for b in SAMPLES {
            assert_eq!(
                levenshtein_distance(a, b),
                levenshtein_distance(b, a),
                "asymmetric for {a:?} / {b:?}"
            );
        }
    }
    assert_eq!(levenshtein_distance("ёлка", "елка"), 1);
}
