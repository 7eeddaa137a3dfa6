//! Content-digest verification for received messages.

use crate::error::IntegrityError;
use crate::transport::ReceivedMessage;

/// Lowercase hex md5 digest of a message body, the format transports
/// report alongside deliveries.
pub fn body_digest(body: &[u8]) -> String {
    format!("{:x}", md5::compute(body))
}

/// Recompute the body digest and compare against the transport-supplied
/// checksum. A mismatch means the body was corrupted in transit and the
/// message must not be handed to a handler or acknowledged.
pub fn verify(message: &ReceivedMessage) -> Result<(), IntegrityError> {
    let computed = body_digest(&message.body);
    if computed == message.body_md5 {
        Ok(())
    } else {
        Err(IntegrityError {
            message_id: message.id.clone(),
            reported: message.body_md5.clone(),
            computed,
        })
    }
}
