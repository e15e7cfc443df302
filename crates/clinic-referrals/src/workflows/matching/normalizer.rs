/// Canonical form used for every name comparison: lower case, `ё` folded to `е`,
/// internal whitespace collapsed to single spaces, no leading/trailing spaces.
pub fn normalize_name(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase().replace('ё', "е")
}

const QUOTE_CHARS: [char; 7] = ['"', '\'', '«', '»', '“', '”', '„'];

const ORGANIZATIONAL_FORMS: [&str; 3] = ["клиника", "ооо", "оао"];

/// Clinic names arrive as `ООО «Клиника Мечта»` or plain `Мечта`; strip the quoting and
/// legal-form words so only the distinguishing part is compared.
pub(crate) fn normalize_clinic_name(value: &str) -> String {
    let unquoted = normalize_name(value).replace(QUOTE_CHARS, " ");
    unquoted
        .split_whitespace()
        .filter(|word| !ORGANIZATIONAL_FORMS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}
