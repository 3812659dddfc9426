use serde::Deserialize;

use crate::core::Team;

/// Body of `POST /games`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    /// Host's display name
    pub player_name: String,
    /// Players per team (3 or 4); server default when omitted
    #[serde(default)]
    pub team_size: Option<usize>,
}

/// Body of `POST /games/:game_id/join`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameRequest {
    pub player_name: String,
}

/// Body of `POST /games/:game_id/team`
#[derive(Debug, Clone, Deserialize)]
pub struct SwitchTeamRequest {
    pub team: Team,
}

/// Messages a client may send over the real-time channel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Attach this connection to a room; with a token it also reclaims a seat
    Subscribe {
        #[serde(rename = "gameId")]
        game_id: String,
        #[serde(rename = "playerToken", default)]
        player_token: Option<String>,
    },
    Unsubscribe,
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_team_size_optional() {
        let req: CreateGameRequest =
            serde_json::from_str(r#"{"playerName":"Alice"}"#).unwrap();
        assert_eq!(req.player_name, "Alice");
        assert_eq!(req.team_size, None);

        let req: CreateGameRequest =
            serde_json::from_str(r#"{"playerName":"Alice","teamSize":3}"#).unwrap();
        assert_eq!(req.team_size, Some(3));
    }

    #[test]
    fn test_join_request_requires_name() {
        assert!(serde_json::from_str::<JoinGameRequest>("{}").is_err());
    }

    #[test]
    fn test_switch_team_request() {
        let req: SwitchTeamRequest = serde_json::from_str(r#"{"team":"B"}"#).unwrap();
        assert_eq!(req.team, Team::B);
        assert!(serde_json::from_str::<SwitchTeamRequest>(r#"{"team":"C"}"#).is_err());
    }

    #[test]
    fn test_client_message_subscribe() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"subscribe","gameId":"K7F3QZ","playerToken":"tok"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Subscribe {
                game_id: "K7F3QZ".to_string(),
                player_token: Some("tok".to_string()),
            }
        );

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe","gameId":"K7F3QZ"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Subscribe {
                player_token: None,
                ..
            }
        ));
    }

    #[test]
    fn test_client_message_simple_variants() {
        assert_eq!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"ping"}"#).unwrap(),
            ClientMessage::Ping
        );
        assert_eq!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"unsubscribe"}"#).unwrap(),
            ClientMessage::Unsubscribe
        );
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"vote"}"#).is_err());
    }
}
