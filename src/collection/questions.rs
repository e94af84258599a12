use crate::canvas::NodeRole;
use crate::catalog::Catalog;

/// Inline examples keyed by lowercase field name.
const FIELD_EXAMPLES: &[(&str, &str)] = &[
    ("host", "db.example.com"),
    ("port", "5432"),
    ("database", "analytics"),
    ("user", "etl_user"),
    ("username", "etl_user"),
    ("schema", "public"),
    ("apikey", "sk_live_51H..."),
    ("apitoken", "zd_9f8e..."),
    ("authtoken", "Bearer eyJhbGciOi..."),
    ("accesstoken", "dapi1234..."),
    ("url", "https://api.example.com"),
    ("baseurl", "https://api.example.com/v1"),
    ("instanceurl", "https://acme.my.salesforce.com"),
    ("webhookurl", "https://hooks.example.com/T000/B000"),
    ("nodeurl", "https://search.example.com:9200"),
    ("email", "ops@example.com"),
    ("storedomain", "acme.myshopify.com"),
    ("subdomain", "acme"),
    ("bucket", "acme-data-lake"),
    ("region", "us-east-1"),
    ("projectid", "acme-analytics-123"),
    ("dataset", "raw_events"),
    ("warehouse", "COMPUTE_WH"),
    ("topic", "orders.v1"),
    ("bootstrapservers", "broker-1:9092,broker-2:9092"),
];

pub fn field_example(field: &str) -> Option<&'static str> {
    let lowered = field.trim().to_lowercase();
    lookup_example(&lowered).or_else(|| {
        // "apiKey/token" and "host/account" fall back to their first alternative.
        lowered
            .split(['/', ' '])
            .next()
            .filter(|head| *head != lowered)
            .and_then(lookup_example)
    })
}

fn lookup_example(key: &str) -> Option<&'static str> {
    FIELD_EXAMPLES
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, example)| *example)
}

pub fn node_name_question(role: NodeRole, catalog: &Catalog) -> String {
    let examples = catalog
        .candidate_names(role)
        .into_iter()
        .take(4)
        .collect::<Vec<_>>()
        .join(", ");
    match role {
        NodeRole::Source => {
            format!("Which system should the data come from? For example: {examples}.")
        }
        NodeRole::Transform => {
            format!("How should the data be transformed on the way? Options: {examples}.")
        }
        NodeRole::Destination => {
            format!("Where should the data be delivered? For example: {examples}.")
        }
    }
}

pub fn mandatory_field_question(
    connector: &str,
    field: &str,
    index: usize,
    total: usize,
) -> String {
    let mut question =
        format!("What is the {field} for {connector}? ({index}/{total} required fields)");
    if let Some(example) = field_example(field) {
        question.push_str(&format!(" Example: {example}"));
    }
    question
}

pub fn optional_field_question(connector: &str, field: &str) -> String {
    let mut question = format!("Optionally, provide the {field} for {connector}.");
    if let Some(example) = field_example(field) {
        question.push_str(&format!(" Example: {example}."));
    }
    question.push_str(" Reply \"skip\" to leave it empty.");
    question
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_questions_always_name_the_connector() {
        let mandatory = mandatory_field_question("Snowflake", "user", 2, 4);
        assert!(mandatory.contains("Snowflake"));
        assert!(mandatory.contains("(2/4 required fields)"));
        assert!(mandatory.contains("etl_user"));

        let optional = optional_field_question("Snowflake", "warehouse");
        assert!(optional.contains("Snowflake"));
        assert!(optional.contains("skip"));
    }

    #[test]
    fn examples_fall_back_to_first_alternative() {
        assert_eq!(field_example("apiKey/token"), Some("sk_live_51H..."));
        assert_eq!(field_example("host/account"), Some("db.example.com"));
        assert_eq!(field_example("password or key"), None);
        assert_eq!(field_example("HOST"), Some("db.example.com"));
    }
}
