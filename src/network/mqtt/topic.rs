//! Subscription topic validation.

use super::Error;

/// Longest topic the protocol can encode.
pub const MAX_TOPIC_LEN: usize = 65535;

/// Check a subscription pattern.
///
/// A valid pattern is non-empty, at most [`MAX_TOPIC_LEN`] bytes long, and uses
/// the wildcards only as whole levels: `+` anywhere, `#` only as the last level.
/// Unlike `mosquitto_sub_topic_check`, the empty pattern is rejected, since a
/// broker refuses an empty SUBSCRIBE filter.
///
/// ```rust
/// use netglue::network::mqtt::topic::check_subscription;
///
/// assert!(check_subscription("sensors/+/temperature").is_ok());
/// assert!(check_subscription("sensors/#").is_ok());
/// assert!(check_subscription("sensors/#/x").is_err());
/// assert!(check_subscription("sensors+").is_err());
/// ```
pub fn check_subscription(topic: &str) -> Result<(), Error> {
    if topic.is_empty() || topic.len() > MAX_TOPIC_LEN {
        return Err(Error::Invalid);
    }
    let mut levels = topic.split('/').peekable();
    while let Some(level) = levels.next() {
        match level {
            "+" => {}
            "#" if levels.peek().is_none() => {}
            level if level.contains(['+', '#']) => return Err(Error::Invalid),
            _ => {}
        }
    }
    Ok(())
}
