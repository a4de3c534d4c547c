//! Request envelope parsing and response shaping.
//!
//! Field extraction mirrors a policy table: each parser names the fields it
//! wants and their types, and yields `None` on any miss. The caller decides
//! what a miss means: silent discard at the top level, a method-specific
//! error shape below it.

use crossbar_api::ResponseBody;
use rmpv::Value;

/// `EINVAL`, kept as a positive constant; the wire carries `-EINVAL`.
pub(crate) const EINVAL: i64 = 22;

/// Top-level request envelope: `{id, method, params}`.
///
/// `id` may be any non-nil scalar and is echoed verbatim in the response.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestEnvelope {
    pub id: Value,
    pub method: String,
    pub params: Value,
}

impl RequestEnvelope {
    /// Extracts the envelope from a decoded wire value.
    ///
    /// Returns `None` if any of the three fields is missing or has the wrong
    /// type; the caller must then discard the message without replying.
    pub fn parse(body: &Value) -> Option<Self> {
        let fields = body.as_map()?;
        let id = field(fields, "id")?;
        if !is_scalar(id) {
            return None;
        }
        let method = field(fields, "method")?.as_str()?;
        let params = field(fields, "params")?;
        params.as_array()?;
        Some(Self {
            id: id.clone(),
            method: method.to_string(),
            params: params.clone(),
        })
    }
}

/// Parameters of a `call` request: `[sid, object, method, args]`.
#[derive(Clone, Debug, PartialEq)]
pub struct CallParams {
    pub sid: String,
    pub object: String,
    pub method: String,
    pub args: Value,
}

impl CallParams {
    pub fn parse(params: &Value) -> Option<Self> {
        let mut fields = params.as_array()?.iter();
        let sid = fields.next()?.as_str()?;
        let object = fields.next()?.as_str()?;
        let method = fields.next()?.as_str()?;
        let args = fields.next()?;
        args.as_map()?;
        Some(Self {
            sid: sid.to_string(),
            object: object.to_string(),
            method: method.to_string(),
            args: args.clone(),
        })
    }
}

/// Parameters of a `list` request: `[sid, path]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ListParams {
    pub sid: String,
    pub path: String,
}

impl ListParams {
    pub fn parse(params: &Value) -> Option<Self> {
        let mut fields = params.as_array()?.iter();
        let sid = fields.next()?.as_str()?;
        let path = fields.next()?.as_str()?;
        Some(Self {
            sid: sid.to_string(),
            path: path.to_string(),
        })
    }
}

/// Parameters of a `login` request: `[username, challenge response]`.
#[derive(Clone, Debug, PartialEq)]
pub struct LoginParams {
    pub username: String,
    pub response: String,
}

impl LoginParams {
    pub fn parse(params: &Value) -> Option<Self> {
        let mut fields = params.as_array()?.iter();
        let username = fields.next()?.as_str()?;
        let response = fields.next()?.as_str()?;
        Some(Self {
            username: username.to_string(),
            response: response.to_string(),
        })
    }
}

/// Parameters of a `logout` request: `[sid]`.
#[derive(Clone, Debug, PartialEq)]
pub struct LogoutParams {
    pub sid: String,
}

impl LogoutParams {
    pub fn parse(params: &Value) -> Option<Self> {
        let sid = params.as_array()?.first()?.as_str()?;
        Some(Self {
            sid: sid.to_string(),
        })
    }
}

/// Response envelope under construction: the echoed id plus the
/// `result`/`error` slot a dispatch branch (or the broker) fills in.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseEnvelope {
    pub id: Value,
    pub body: ResponseBody,
}

impl ResponseEnvelope {
    /// Starts a response scaffold echoing `id`, with an empty body.
    pub fn new(id: Value) -> Self {
        Self {
            id,
            body: ResponseBody::Empty,
        }
    }

    /// Renders the wire map `{jsonrpc: "2.0", id, result|error}`.
    ///
    /// An `Empty` body renders neither field.
    pub fn into_value(self) -> Value {
        let mut fields = vec![
            (Value::from("jsonrpc"), Value::from("2.0")),
            (Value::from("id"), self.id),
        ];
        match self.body {
            ResponseBody::Empty => {}
            ResponseBody::Result(value) => fields.push((Value::from("result"), value)),
            ResponseBody::Error(value) => fields.push((Value::from("error"), value)),
        }
        Value::Map(fields)
    }
}

/// Challenge token derived from the peer handle: eight lowercase hex digits.
///
/// Deterministic and trivially predictable; this is a liveness token, not a
/// secret.
pub fn challenge_token(peer: u32) -> String {
    format!("{peer:08x}")
}

pub(crate) fn invalid_method() -> Value {
    Value::Map(vec![
        (Value::from("code"), Value::from(-EINVAL)),
        (Value::from("str"), Value::from("Invalid Method")),
    ])
}

pub(crate) fn invalid_call_params() -> Value {
    Value::Map(vec![
        (Value::from("code"), Value::from(-EINVAL)),
        (Value::from("str"), Value::from("Invalid call message format!")),
    ])
}

pub(crate) fn login_invalid_params() -> Value {
    Value::Map(vec![(Value::from("code"), Value::from("EINVAL"))])
}

pub(crate) fn login_denied() -> Value {
    Value::Map(vec![(Value::from("code"), Value::from("EACCESS"))])
}

// The bare string is an inconsistency inherited from the wire protocol;
// clients match on it.
pub(crate) fn logout_failed() -> Value {
    Value::from("Could not logout!")
}

fn field<'a>(fields: &'a [(Value, Value)], name: &str) -> Option<&'a Value> {
    fields
        .iter()
        .find(|(key, _)| key.as_str() == Some(name))
        .map(|(_, value)| value)
}

fn is_scalar(value: &Value) -> bool {
    !matches!(
        value,
        Value::Nil | Value::Array(_) | Value::Map(_) | Value::Ext(..)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(id: Value, method: &str, params: Value) -> Value {
        Value::Map(vec![
            (Value::from("id"), id),
            (Value::from("method"), Value::from(method)),
            (Value::from("params"), params),
        ])
    }

    #[test]
    fn parses_a_complete_envelope() {
        let body = envelope(Value::from(7), "call", Value::Array(vec![]));
        let request = RequestEnvelope::parse(&body).expect("parse");
        assert_eq!(request.id, Value::from(7));
        assert_eq!(request.method, "call");
        assert_eq!(request.params, Value::Array(vec![]));
    }

    #[test]
    fn string_ids_are_accepted_and_kept_verbatim() {
        let body = envelope(Value::from("abc"), "challenge", Value::Array(vec![]));
        let request = RequestEnvelope::parse(&body).expect("parse");
        assert_eq!(request.id, Value::from("abc"));
    }

    #[test]
    fn rejects_missing_or_mistyped_top_level_fields() {
        let missing_id = Value::Map(vec![
            (Value::from("method"), Value::from("call")),
            (Value::from("params"), Value::Array(vec![])),
        ]);
        assert!(RequestEnvelope::parse(&missing_id).is_none());

        let nil_id = envelope(Value::Nil, "call", Value::Array(vec![]));
        assert!(RequestEnvelope::parse(&nil_id).is_none());

        let container_id = envelope(Value::Array(vec![]), "call", Value::Array(vec![]));
        assert!(RequestEnvelope::parse(&container_id).is_none());

        let numeric_method = envelope(Value::from(1), "call", Value::Array(vec![]));
        let numeric_method = match numeric_method {
            Value::Map(mut fields) => {
                fields[1].1 = Value::from(9);
                Value::Map(fields)
            }
            _ => unreachable!(),
        };
        assert!(RequestEnvelope::parse(&numeric_method).is_none());

        let params_not_array = envelope(Value::from(1), "call", Value::Map(vec![]));
        assert!(RequestEnvelope::parse(&params_not_array).is_none());

        assert!(RequestEnvelope::parse(&Value::from("not a map")).is_none());
    }

    #[test]
    fn call_params_require_three_strings_and_a_table() {
        let good = Value::Array(vec![
            Value::from("sid-1"),
            Value::from("system"),
            Value::from("info"),
            Value::Map(vec![]),
        ]);
        let params = CallParams::parse(&good).expect("parse");
        assert_eq!(params.object, "system");
        assert_eq!(params.method, "info");

        let args_not_table = Value::Array(vec![
            Value::from("sid-1"),
            Value::from("system"),
            Value::from("info"),
            Value::Array(vec![]),
        ]);
        assert!(CallParams::parse(&args_not_table).is_none());

        let too_short = Value::Array(vec![Value::from("sid-1"), Value::from("system")]);
        assert!(CallParams::parse(&too_short).is_none());
    }

    #[test]
    fn trailing_params_entries_are_ignored() {
        let with_extra = Value::Array(vec![
            Value::from("sid-1"),
            Value::from("wildcard"),
            Value::from("extra"),
        ]);
        let params = ListParams::parse(&with_extra).expect("parse");
        assert_eq!(params.path, "wildcard");
    }

    #[test]
    fn login_and_logout_params_extract_strings() {
        let login = Value::Array(vec![Value::from("admin"), Value::from("resp")]);
        let params = LoginParams::parse(&login).expect("parse");
        assert_eq!(params.username, "admin");
        assert_eq!(params.response, "resp");
        assert!(LoginParams::parse(&Value::Array(vec![Value::from("admin")])).is_none());

        let logout = Value::Array(vec![Value::from("sid-9")]);
        assert_eq!(LogoutParams::parse(&logout).expect("parse").sid, "sid-9");
        assert!(LogoutParams::parse(&Value::Array(vec![])).is_none());
    }

    #[test]
    fn empty_body_renders_neither_result_nor_error() {
        let rendered = ResponseEnvelope::new(Value::from(3)).into_value();
        assert_eq!(
            rendered,
            Value::Map(vec![
                (Value::from("jsonrpc"), Value::from("2.0")),
                (Value::from("id"), Value::from(3)),
            ])
        );
    }

    #[test]
    fn result_and_error_render_under_their_own_key() {
        let mut response = ResponseEnvelope::new(Value::from(4));
        response.body.set_result(Value::from(true));
        assert_eq!(
            response.into_value(),
            Value::Map(vec![
                (Value::from("jsonrpc"), Value::from("2.0")),
                (Value::from("id"), Value::from(4)),
                (Value::from("result"), Value::from(true)),
            ])
        );

        let mut response = ResponseEnvelope::new(Value::from(4));
        response.body.set_error(invalid_method());
        let Value::Map(fields) = response.into_value() else {
            panic!("expected a map");
        };
        assert_eq!(fields[2].0, Value::from("error"));
    }

    #[test]
    fn challenge_token_is_zero_padded_hex() {
        assert_eq!(challenge_token(0xdead_beef), "deadbeef");
        assert_eq!(challenge_token(0x2a), "0000002a");
    }
}
