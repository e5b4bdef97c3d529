use serde::{Deserialize, Deserializer, Serialize};

/// Ollama `/chat` 请求体。缺失或为 null 的字段按空值处理，与宽松绑定保持一致。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPrompt {
    #[serde(default, deserialize_with = "null_as_default")]
    pub model: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

impl ChatPrompt {
    /// 解析请求体；顶层 `null` 视为空 prompt，数组等非对象一律拒绝
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        match serde_json::from_slice::<serde_json::Value>(body)? {
            serde_json::Value::Null => Ok(Self::default()),
            v @ serde_json::Value::Object(_) => serde_json::from_value(v),
            _ => Err(serde::de::Error::custom("chat prompt must be a JSON object")),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_empty() {
        let p: ChatPrompt = serde_json::from_str("{}").unwrap();
        assert_eq!(p, ChatPrompt::default());

        let p: ChatPrompt = serde_json::from_str(r#"{"messages":[{"role":"user"}]}"#).unwrap();
        assert_eq!(p.model, "");
        assert_eq!(p.messages[0].role, "user");
        assert_eq!(p.messages[0].content, "");
    }

    #[test]
    fn null_fields_default_to_empty() {
        let p = ChatPrompt::from_slice(br#"{"model":null,"messages":[]}"#).unwrap();
        assert_eq!(p, ChatPrompt::default());

        let p = ChatPrompt::from_slice(br#"{"model":"m","messages":null}"#).unwrap();
        assert_eq!(p.model, "m");
        assert!(p.messages.is_empty());

        let p = ChatPrompt::from_slice(br#"{"messages":[{"role":null,"content":"hi"}]}"#)
            .unwrap();
        assert_eq!(p.messages[0].role, "");
        assert_eq!(p.messages[0].content, "hi");
    }

    #[test]
    fn bare_null_body_is_an_empty_prompt() {
        assert_eq!(ChatPrompt::from_slice(b"null").unwrap(), ChatPrompt::default());
        assert!(ChatPrompt::from_slice(b"").is_err());
    }

    #[test]
    fn message_order_is_preserved() {
        let p: ChatPrompt = serde_json::from_str(
            r#"{"model":"llama3","messages":[
                {"role":"system","content":"s"},
                {"role":"user","content":"u"},
                {"role":"assistant","content":"a"}
            ]}"#,
        )
        .unwrap();
        let roles: Vec<_> = p.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["system", "user", "assistant"]);
    }

    #[test]
    fn wrong_shape_is_rejected() {
        for body in [r#"{"model": 3}"#, r#"{"messages": "hi"}"#, "[]", "\"text\"", "7"] {
            assert!(ChatPrompt::from_slice(body.as_bytes()).is_err(), "{body}");
        }
    }
}
