//! Discord embed encoding for rendered incident messages.

use relay_core::{http_retry::truncate_for_error, MessageContent, FIELD_VALUE_MAX_CHARS};
use serde_json::{json, Value};

const EMBED_TITLE_MAX_CHARS: usize = 256;
const EMBED_DESCRIPTION_MAX_CHARS: usize = 4096;
const EMBED_FIELD_NAME_MAX_CHARS: usize = 256;
const EMBED_FOOTER_MAX_CHARS: usize = 2048;
const EMBED_MAX_FIELDS: usize = 25;
const EMBED_TOTAL_MAX_CHARS: usize = 6000;
// Reserved in the description for the omitted-updates note.
const OMITTED_NOTE_MAX_CHARS: usize = 48;

/// Encodes `content` as one embed within Discord's per-embed limits.
///
/// When not every update fits, the newest ones are kept and the description
/// says how many earlier updates were left out.
pub fn embed_payload(content: &MessageContent) -> Value {
    let title = clamp(&content.title, EMBED_TITLE_MAX_CHARS);
    let mut description = clamp(
        &content.description,
        EMBED_DESCRIPTION_MAX_CHARS - OMITTED_NOTE_MAX_CHARS,
    );
    let footer = clamp(&content.footer, EMBED_FOOTER_MAX_CHARS);

    let fixed_chars =
        char_count(&title) + char_count(&description) + char_count(&footer) + OMITTED_NOTE_MAX_CHARS;
    let mut budget = EMBED_TOTAL_MAX_CHARS.saturating_sub(fixed_chars);
    let mut fields = Vec::new();
    for field in content.fields.iter().rev() {
        if fields.len() == EMBED_MAX_FIELDS {
            break;
        }
        let name = clamp(&field.name, EMBED_FIELD_NAME_MAX_CHARS);
        let value = clamp(&field.value, FIELD_VALUE_MAX_CHARS);
        let cost = char_count(&name) + char_count(&value);
        if cost > budget {
            break;
        }
        budget -= cost;
        fields.push(json!({
            "name": name,
            "value": value,
            "inline": false,
        }));
    }
    fields.reverse();

    let omitted = content.fields.len() - fields.len();
    if omitted > 0 {
        let plural = if omitted == 1 { "" } else { "s" };
        description.push_str(&format!("\n\n_{omitted} earlier update{plural} omitted_"));
    }

    let mut embed = json!({
        "title": title,
        "description": description,
        "timestamp": content.timestamp.to_rfc3339(),
        "color": content.color,
        "fields": fields,
        "footer": { "text": footer },
    });
    if let Some(url) = content.url.as_deref() {
        embed["url"] = Value::String(url.to_string());
    }
    embed
}

fn char_count(value: &str) -> usize {
    value.chars().count()
}

// Leaves room for the ellipsis so the result stays within `max_chars`.
fn clamp(value: &str, max_chars: usize) -> String {
    if char_count(value) <= max_chars {
        return value.to_string();
    }
    truncate_for_error(value, max_chars.saturating_sub(3))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use relay_core::{MessageContent, MessageField};
    use serde_json::json;

    use super::embed_payload;

    fn content() -> MessageContent {
        MessageContent {
            title: "Increased API Latency".to_string(),
            url: Some("https://stspg.io/ntfpn88g01pl".to_string()),
            description: "Impact: minor\nAffected Components: API".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 8, 27, 20, 15, 35).unwrap(),
            color: 0xa50626,
            fields: vec![MessageField {
                name: "Investigating (<t:1724789735:R>) - u1".to_string(),
                value: "Looking into it".to_string(),
            }],
            footer: "wlf7gks7nb1m".to_string(),
        }
    }

    #[test]
    fn unit_embed_payload_maps_every_content_part() {
        let embed = embed_payload(&content());
        assert_eq!(
            embed,
            json!({
                "title": "Increased API Latency",
                "url": "https://stspg.io/ntfpn88g01pl",
                "description": "Impact: minor\nAffected Components: API",
                "timestamp": "2024-08-27T20:15:35+00:00",
                "color": 0xa50626,
                "fields": [{
                    "name": "Investigating (<t:1724789735:R>) - u1",
                    "value": "Looking into it",
                    "inline": false
                }],
                "footer": {"text": "wlf7gks7nb1m"}
            })
        );
    }

    #[test]
    fn regression_embed_payload_omits_missing_url_and_clamps_title() {
        let mut content = content();
        content.url = None;
        content.title = "x".repeat(300);
        let embed = embed_payload(&content);
        assert!(embed.get("url").is_none());
        assert_eq!(
            embed["title"].as_str().expect("title").chars().count(),
            256
        );
    }

    fn content_with_updates(count: usize, body_chars: usize) -> MessageContent {
        let mut content = content();
        content.fields = (1..=count)
            .map(|index| MessageField {
                name: format!("Investigating (<t:1724789735:R>) - u{index}"),
                value: "x".repeat(body_chars),
            })
            .collect();
        content
    }

    fn embed_chars(embed: &serde_json::Value) -> usize {
        let text = |value: &serde_json::Value| value.as_str().unwrap_or_default().chars().count();
        let fields = embed["fields"].as_array().expect("fields");
        text(&embed["title"])
            + text(&embed["description"])
            + text(&embed["footer"]["text"])
            + fields
                .iter()
                .map(|field| text(&field["name"]) + text(&field["value"]))
                .sum::<usize>()
    }

    #[test]
    fn regression_long_incident_fits_embed_total_limit() {
        let embed = embed_payload(&content_with_updates(30, 400));
        let fields = embed["fields"].as_array().expect("fields");
        assert!(fields.len() < 30);
        assert!(embed_chars(&embed) <= 6000);
        assert_eq!(
            fields.last().expect("newest")["name"],
            "Investigating (<t:1724789735:R>) - u30"
        );
        let omitted = 30 - fields.len();
        let description = embed["description"].as_str().expect("description");
        assert!(description.starts_with("Impact: minor"));
        assert!(description.ends_with(&format!("_{omitted} earlier updates omitted_")));
    }

    #[test]
    fn regression_many_short_updates_keep_newest_twenty_five() {
        let embed = embed_payload(&content_with_updates(30, 20));
        let fields = embed["fields"].as_array().expect("fields");
        assert_eq!(fields.len(), 25);
        assert_eq!(fields[0]["name"], "Investigating (<t:1724789735:R>) - u6");
        assert!(embed["description"]
            .as_str()
            .expect("description")
            .ends_with("_5 earlier updates omitted_"));
    }
}
