use crate::error::{ApiError, ApiResult};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

/// First frame the server sends on a fresh socket
pub const AUTHORIZATION_PROMPT: &str = "AUTHORIZATION";

/// Reply to the prompt: the bearer token, optionally scoped to a company
pub fn authorization_line(access_token: &str, scope: Option<&str>) -> String {
    match scope.filter(|s| !s.is_empty()) {
        Some(company_id) => format!("companyId={},Bearer {}", company_id, access_token),
        None => format!("Bearer {}", access_token),
    }
}

/// Run the in-band authentication exchange on an open socket.
///
/// Reads one text frame; it must be the prompt, otherwise the received text
/// becomes the error and nothing is written.
pub async fn handshake<S>(socket: &mut S, access_token: &str, scope: Option<&str>) -> ApiResult<()>
where
    S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
{
    let prompt = loop {
        match socket.next().await {
            Some(Ok(Message::Text(text))) => break text,
            Some(Ok(Message::Binary(data))) => break String::from_utf8_lossy(&data).into_owned(),
            Some(Ok(Message::Close(_))) | None => {
                return Err(ApiError::Protocol(
                    "socket closed before authorization prompt".to_string(),
                ))
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    };

    if prompt != AUTHORIZATION_PROMPT {
        tracing::warn!(target: "api::events", received = %prompt, "Unexpected handshake prompt");
        return Err(ApiError::Protocol(prompt));
    }

    socket
        .send(Message::Text(authorization_line(access_token, scope)))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unscoped_line_is_plain_bearer() {
        assert_eq!(authorization_line("tok", None), "Bearer tok");
        assert_eq!(authorization_line("tok", Some("")), "Bearer tok");
    }

    #[test]
    fn scoped_line_prefixes_company() {
        assert_eq!(
            authorization_line("tok", Some("1234")),
            "companyId=1234,Bearer tok"
        );
    }
}
