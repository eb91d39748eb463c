//! Case-insensitive substring filters used by the admin and patient lists

use crate::models::{Message, PatientRecord};

/// Lowercased query, whitespace kept. An empty query matches everything.
fn normalize(query: &str) -> String {
    query.to_lowercase()
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Keep the items for which any of the extracted fields contains the query
pub fn filter_by<'a, T, F, I>(items: &'a [T], query: &str, fields: F) -> Vec<&'a T>
where
    F: Fn(&'a T) -> I,
    I: IntoIterator<Item = &'a str>,
{
    let needle = normalize(query);
    if needle.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|item| fields(*item).into_iter().any(|field| contains(field, &needle)))
        .collect()
}

/// Patients list: name or email
pub fn filter_patients<'a>(records: &'a [PatientRecord], query: &str) -> Vec<&'a PatientRecord> {
    filter_by(records, query, |r| [r.patient_name.as_str(), r.email.as_str()])
}

/// Records list: patient name, record id or any listed ailment
pub fn filter_records<'a>(records: &'a [PatientRecord], query: &str) -> Vec<&'a PatientRecord> {
    filter_by(records, query, |r| {
        [r.patient_name.as_str(), r.id.as_str()]
            .into_iter()
            .chain(r.ailments.iter().map(String::as_str))
    })
}

/// Message history: patient name or content
pub fn filter_messages<'a>(messages: &'a [Message], query: &str) -> Vec<&'a Message> {
    filter_by(messages, query, |m| [m.patient_name.as_str(), m.content.as_str()])
}

pub fn filter_ailments(catalog: &[&'static str], query: &str) -> Vec<&'static str> {
    let needle = normalize(query);
    catalog
        .iter()
        .copied()
        .filter(|ailment| needle.is_empty() || contains(ailment, &needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_data;

    #[test]
    fn test_empty_query_keeps_everything() {
        let records = mock_data::patients();
        assert_eq!(filter_patients(&records, "").len(), 5);
        assert_eq!(filter_records(&records, "").len(), 5);
        assert_eq!(filter_ailments(mock_data::AILMENTS, "").len(), 24);
    }

    #[test]
    fn test_whitespace_is_part_of_the_query() {
        let records = mock_data::patients();
        // every seeded name has a space
        assert_eq!(filter_patients(&records, " ").len(), 5);
        assert!(filter_records(&records, "   ").is_empty());
        assert!(filter_patients(&records, " jane").is_empty());
    }

    #[test]
    fn test_patients_by_name_or_email() {
        let records = mock_data::patients();
        let names: Vec<_> = filter_patients(&records, "JANE")
            .into_iter()
            .map(|r| r.patient_name.as_str())
            .collect();
        assert_eq!(names, vec!["Jane Smith"]);
        assert_eq!(filter_patients(&records, "david@").len(), 1);
        assert!(filter_patients(&records, "zzz").is_empty());
    }

    #[test]
    fn test_records_by_id_or_ailment() {
        let records = mock_data::patients();
        assert_eq!(filter_records(&records, "rec-003")[0].patient_name, "Michael Johnson");
        let diabetic: Vec<_> = filter_records(&records, "diabetes")
            .into_iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(diabetic, vec!["rec-003"]);
        // email is not a records search field
        assert!(filter_records(&records, "jane@example").is_empty());
    }

    #[test]
    fn test_messages_by_name_or_content() {
        let messages = mock_data::messages();
        assert_eq!(filter_messages(&messages, "john doe").len(), 2);
        assert_eq!(filter_messages(&messages, "medication").len(), 1);
        assert_eq!(filter_messages(&messages, "JOHN").len(), 3);
        assert!(filter_messages(&messages, "nothing like this").is_empty());
    }

    #[test]
    fn test_ailment_filter() {
        let found = filter_ailments(mock_data::AILMENTS, "weight");
        assert_eq!(found, vec!["Weight loss", "Weight gain"]);
    }
}
