//! JSON documents exchanged with the runtime for timers and reminders.
//!
//! ```json
//! {"callback":"onTick","data":"eyJuIjoxfQ==","dueTime":"0h0m0s0ms","period":"0h0m10s0ms"}
//! ```
//!
//! `data` is the base64 of the serializer output and is omitted when there is none.
//! Reminder documents have the same shape without `callback`.

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    duration::{Interval, serde_interval},
    errors::{FormatError, SerializerError},
    timer::{ActorReminderParams, ActorTimer},
};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimerPayload {
    callback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(with = "serde_interval")]
    due_time: Interval,
    #[serde(with = "serde_interval")]
    period: Interval,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReminderPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(with = "serde_interval")]
    due_time: Interval,
    #[serde(with = "serde_interval")]
    period: Interval,
}

pub(crate) fn encode_timer(timer: &ActorTimer) -> Result<Bytes, SerializerError> {
    let data = (!timer.state().is_empty()).then(|| STANDARD.encode(timer.state()));

    to_json(&TimerPayload {
        callback: timer.callback().to_owned(),
        data,
        due_time: timer.due_time(),
        period: timer.period(),
    })
}

pub(crate) fn decode_timer(name: String, payload: &[u8]) -> Result<ActorTimer, FormatError> {
    let doc: TimerPayload = from_json(payload)?;
    let state = decode_data(payload, doc.data.as_deref())?.unwrap_or_default();

    Ok(ActorTimer::new(
        name,
        doc.callback,
        state,
        doc.due_time,
        doc.period,
    ))
}

pub(crate) fn encode_reminder(params: &ActorReminderParams) -> Result<Bytes, SerializerError> {
    to_json(&ReminderPayload {
        data: params.data().map(|d| STANDARD.encode(d)),
        due_time: params.due_time(),
        period: params.period(),
    })
}

pub(crate) fn decode_reminder(payload: &[u8]) -> Result<ActorReminderParams, FormatError> {
    let doc: ReminderPayload = from_json(payload)?;
    let data = decode_data(payload, doc.data.as_deref())?;

    Ok(ActorReminderParams::new(data, doc.due_time, doc.period))
}

fn to_json<T: Serialize>(doc: &T) -> Result<Bytes, SerializerError> {
    serde_json::to_vec(doc)
        .map(Bytes::from)
        .map_err(|e| SerializerError::new(e.to_string()))
}

fn from_json<'a, T: Deserialize<'a>>(payload: &'a [u8]) -> Result<T, FormatError> {
    serde_json::from_slice(payload)
        .map_err(|e| FormatError::new(String::from_utf8_lossy(payload), e.to_string()))
}

fn decode_data(payload: &[u8], data: Option<&str>) -> Result<Option<Bytes>, FormatError> {
    data.map(|d| {
        STANDARD
            .decode(d)
            .map(Bytes::from)
            .map_err(|e| FormatError::new(String::from_utf8_lossy(payload), e.to_string()))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn test_timer_document_layout() {
        let timer = ActorTimer::new(
            "maru_Timer_1",
            "onTick",
            Bytes::from_static(br#"{"n":1}"#),
            Interval::IMMEDIATE,
            Interval::from_secs(10),
        );

        let doc: Value = serde_json::from_slice(&timer.encode().unwrap()).unwrap();

        assert_eq!(
            doc,
            json!({
                "callback": "onTick",
                "data": "eyJuIjoxfQ==",
                "dueTime": "0h0m0s0ms",
                "period": "0h0m10s0ms",
            })
        );
    }

    #[test]
    fn test_timer_decodes_back() {
        let timer = ActorTimer::new(
            "tick",
            "onTick",
            Bytes::from_static(b"state"),
            Interval::from_millis(1500),
            Interval::Disabled,
        );

        let back = ActorTimer::decode("tick", &timer.encode().unwrap()).unwrap();
        assert_eq!(back, timer);
    }

    #[test]
    fn test_reminder_without_data_omits_field() {
        let params = ActorReminderParams::new(None, Interval::from_secs(5), Interval::Disabled);
        let doc: Value = serde_json::from_slice(&params.encode().unwrap()).unwrap();

        assert_eq!(doc, json!({ "dueTime": "0h0m5s0ms", "period": "" }));
        assert_eq!(
            ActorReminderParams::decode(&params.encode().unwrap()).unwrap(),
            params
        );
    }

    #[test]
    fn test_reminder_rejects_bad_documents() {
        assert!(ActorReminderParams::decode(b"not json").is_err());
        assert!(ActorReminderParams::decode(br#"{"dueTime":"5x","period":""}"#).is_err());
        assert!(
            ActorReminderParams::decode(br#"{"data":"%%%","dueTime":"1s","period":""}"#).is_err()
        );
    }
}
