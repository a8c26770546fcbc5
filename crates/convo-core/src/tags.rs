//! Tag Parser — converts raw tag strings from the story interpreter's
//! `currentTags` into a structured [`TagMap`].
//!
//! Pure and side-effect-free: the same tag sequence always produces the same
//! map, and nothing here touches story state or the clock.

use std::collections::HashMap;

/// A single parsed tag value, prior to any typed interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    /// A bare `key` tag with no colon — `key = true`.
    Flag,
    /// A `key:rest` tag, trimmed.
    Text(String),
}

/// Namespaced `status:sub:value` tags. `presence:X` is routed here too, as
/// `status.presence`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusMap {
    battery: Option<i64>,
    signal: Option<i64>,
    presence: Option<String>,
    other: HashMap<String, String>,
}

impl StatusMap {
    pub fn battery(&self) -> Option<i64> {
        self.battery
    }

    pub fn signal(&self) -> Option<i64> {
        self.signal
    }

    pub fn presence(&self) -> Option<&str> {
        self.presence.as_deref()
    }

    pub fn get(&self, sub: &str) -> Option<&str> {
        match sub {
            "battery" | "signal" => None,
            "presence" => self.presence.as_deref(),
            _ => self.other.get(sub).map(String::as_str),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.battery.is_none()
            && self.signal.is_none()
            && self.presence.is_none()
            && self.other.is_empty()
    }
}

/// `receipt:status:label` — an explicit, label-addressed receipt upgrade
/// captured in the current chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptDeferred {
    pub status: String,
    pub label: String,
}

/// The structured result of parsing one chunk's tag sequence.
///
/// Narrow typed accessors are provided for every tag in the authoritative
/// vocabulary; unknown tags are parsed into `fields` but have
/// no named accessor, since schema enforcement lives upstream in the
/// authoring linters, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMap {
    fields: HashMap<String, TagValue>,
    status: StatusMap,
    receipt: Option<String>,
    receipt_deferred: Option<ReceiptDeferred>,
}

impl TagMap {
    /// Parse an ordered tag sequence into a `TagMap`. Duplicate keys within
    /// the sequence are resolved last-wins.
    pub fn parse<S: AsRef<str>>(tags: &[S]) -> Self {
        let mut map = TagMap::default();

        for raw in tags {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }

            match raw.split_once(':') {
                None => {
                    map.fields.insert(raw.to_string(), TagValue::Flag);
                }
                Some((key, rest)) => {
                    let key = key.trim();
                    let rest = rest.trim();
                    match key {
                        "status" => match rest.split_once(':') {
                            Some((sub, value)) => {
                                let sub = sub.trim();
                                let value = value.trim();
                                match sub {
                                    "battery" => match value.parse::<i64>() {
                                        Ok(n) => map.status.battery = Some(n),
                                        Err(_) => tracing::warn!(
                                            value,
                                            "status:battery tag is not an integer"
                                        ),
                                    },
                                    "signal" => match value.parse::<i64>() {
                                        Ok(n) => map.status.signal = Some(n),
                                        Err(_) => tracing::warn!(
                                            value,
                                            "status:signal tag is not an integer"
                                        ),
                                    },
                                    other => {
                                        map.status.other.insert(other.to_string(), value.to_string());
                                    }
                                }
                            }
                            None => tracing::warn!(tag = raw, "malformed status tag, ignoring"),
                        },
                        "presence" => {
                            map.status.presence = Some(rest.to_string());
                        }
                        "receipt" => match rest.split_once(':') {
                            Some((status, label)) => {
                                map.receipt_deferred = Some(ReceiptDeferred {
                                    status: status.trim().to_string(),
                                    label: label.trim().to_string(),
                                });
                                map.receipt = None;
                            }
                            None => {
                                map.receipt = Some(rest.to_string());
                                map.receipt_deferred = None;
                            }
                        },
                        _ => {
                            map.fields
                                .insert(key.to_string(), TagValue::Text(rest.to_string()));
                        }
                    }
                }
            }
        }

        map
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(TagValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    fn get_flag(&self, key: &str) -> bool {
        matches!(self.fields.get(key), Some(TagValue::Flag))
            || matches!(self.fields.get(key), Some(TagValue::Text(s)) if s == "true")
    }

    pub fn speaker(&self) -> Option<&str> {
        self.get_str("speaker")
    }

    pub fn message_type(&self) -> Option<&str> {
        self.get_str("type")
    }

    pub fn time(&self) -> Option<&str> {
        self.get_str("time")
    }

    pub fn date(&self) -> Option<&str> {
        self.get_str("date")
    }

    pub fn day(&self) -> Option<&str> {
        self.get_str("day")
    }

    pub fn delay_ms(&self) -> Option<u64> {
        self.get_str("delay").and_then(|s| s.parse().ok())
    }

    pub fn attachment(&self) -> Option<&str> {
        self.get_str("attachment")
    }

    pub fn image(&self) -> Option<&str> {
        self.get_str("image")
    }

    pub fn audio(&self) -> Option<&str> {
        self.get_str("audio")
    }

    pub fn duration(&self) -> Option<f64> {
        self.get_str("duration").and_then(|s| s.parse().ok())
    }

    pub fn sfx(&self) -> Option<&str> {
        self.get_str("sfx")
    }

    pub fn class(&self) -> Option<&str> {
        self.get_str("class")
    }

    pub fn view(&self) -> Option<&str> {
        self.get_str("view")
    }

    pub fn clear(&self) -> bool {
        self.get_flag("clear")
    }

    pub fn status(&self) -> &StatusMap {
        &self.status
    }

    pub fn presence(&self) -> Option<&str> {
        self.status.presence()
    }

    pub fn connection(&self) -> Option<&str> {
        self.get_str("connection")
    }

    pub fn story_start(&self) -> bool {
        self.get_flag("story_start")
    }

    pub fn target_chat(&self) -> Option<&str> {
        self.get_str("targetChat")
    }

    pub fn notification_preview(&self) -> Option<&str> {
        self.get_str("notificationPreview")
    }

    pub fn immediate(&self) -> bool {
        self.get_flag("immediate")
    }

    pub fn label(&self) -> Option<&str> {
        self.get_str("label")
    }

    pub fn quote_ref(&self) -> Option<&str> {
        self.get_str("quoteRef")
    }

    pub fn quote(&self) -> Option<&str> {
        self.get_str("quote")
    }

    pub fn quote_from(&self) -> Option<&str> {
        self.get_str("quoteFrom")
    }

    pub fn quote_image(&self) -> Option<&str> {
        self.get_str("quoteImage")
    }

    pub fn quote_audio(&self) -> Option<&str> {
        self.get_str("quoteAudio")
    }

    pub fn link_url(&self) -> Option<&str> {
        self.get_str("linkUrl")
    }

    pub fn link_domain(&self) -> Option<&str> {
        self.get_str("linkDomain")
    }

    pub fn link_title(&self) -> Option<&str> {
        self.get_str("linkTitle")
    }

    pub fn link_desc(&self) -> Option<&str> {
        self.get_str("linkDesc")
    }

    pub fn link_image(&self) -> Option<&str> {
        self.get_str("linkImage")
    }

    pub fn link_layout(&self) -> Option<&str> {
        self.get_str("linkLayout")
    }

    pub fn link_video(&self) -> bool {
        self.get_flag("linkVideo")
    }

    pub fn typing(&self) -> bool {
        self.get_flag("typing")
    }

    pub fn receipt(&self) -> Option<&str> {
        self.receipt.as_deref()
    }

    pub fn receipt_deferred(&self) -> Option<&ReceiptDeferred> {
        self.receipt_deferred.as_ref()
    }

    /// True if no tag in the chunk carried anything beyond a `status:*`/
    /// `presence:*` namespace entry — used by the chunk step to detect a
    /// status-only chunk.
    pub fn has_only_status(&self) -> bool {
        !self.status.is_empty()
            && self.receipt.is_none()
            && self.receipt_deferred.is_none()
            && self.fields.is_empty()
    }

    pub fn is_empty_of_content(&self) -> bool {
        self.status.is_empty()
            && self.fields.is_empty()
            && self.receipt.is_none()
            && self.receipt_deferred.is_none()
    }

    /// True if the only content-bearing tag in the chunk is `delay:*`
    /// ("Delay only").
    pub fn has_only_delay(&self) -> bool {
        self.status.is_empty()
            && self.receipt.is_none()
            && self.receipt_deferred.is_none()
            && self.fields.len() == 1
            && self.fields.contains_key("delay")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_tag_is_a_flag() {
        let map = TagMap::parse(&["story_start"]);
        assert!(map.story_start());
    }

    #[test]
    fn keyed_tag_is_trimmed() {
        let map = TagMap::parse(&["speaker:  Pat  "]);
        assert_eq!(map.speaker(), Some("Pat"));
    }

    #[test]
    fn status_sub_battery_parses_as_integer() {
        let map = TagMap::parse(&["status:battery:75"]);
        assert_eq!(map.status().battery(), Some(75));
    }

    #[test]
    fn status_sub_weather_stays_a_string() {
        let map = TagMap::parse(&["status:weather:rainy"]);
        assert_eq!(map.status().get("weather"), Some("rainy"));
    }

    #[test]
    fn presence_preserves_lastseen_form() {
        let map = TagMap::parse(&["presence:lastseen:14:30"]);
        assert_eq!(map.presence(), Some("lastseen:14:30"));
    }

    #[test]
    fn receipt_status_label_is_deferred() {
        let map = TagMap::parse(&["receipt:read:msg-42"]);
        assert_eq!(
            map.receipt_deferred(),
            Some(&ReceiptDeferred {
                status: "read".to_string(),
                label: "msg-42".to_string()
            })
        );
        assert_eq!(map.receipt(), None);
    }

    #[test]
    fn receipt_status_alone_is_immediate() {
        let map = TagMap::parse(&["receipt:delivered"]);
        assert_eq!(map.receipt(), Some("delivered"));
        assert_eq!(map.receipt_deferred(), None);
    }

    #[test]
    fn duplicate_keys_last_wins() {
        let map = TagMap::parse(&["speaker:Pat", "speaker:Sam"]);
        assert_eq!(map.speaker(), Some("Sam"));
    }

    #[test]
    fn unknown_sub_key_is_ignored_but_non_fatal() {
        let map = TagMap::parse(&["status:"]);
        assert!(map.status().is_empty());
    }
}
