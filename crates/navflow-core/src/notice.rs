use std::fmt;

use serde_json::Value;

use crate::api::ApiError;

const MESSAGE_KEYS: [&str; 3] =
  ["detail", "message", "error"];

/// One-line, user-facing rendering of a
/// failed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub message: String,
  pub hint:    Option<&'static str>
}

impl Notice {
  /// Prefers what the server said; falls
  /// back to the outermost context, which
  /// command handlers set to a generic
  /// per-action text.
  pub fn from_error(
    err: &anyhow::Error
  ) -> Self {
    let api = err.chain().find_map(|e| {
      e.downcast_ref::<ApiError>()
    });
    let action = err.to_string();

    match api {
      | Some(ApiError::SessionExpired)
      | Some(ApiError::NotSignedIn) => {
        Notice {
          message: api
            .map(|e| e.to_string())
            .unwrap_or_default(),
          hint:    Some(
            "run `navflow login` to sign \
             in"
          )
        }
      }
      | Some(ApiError::Status {
        message: Some(message),
        ..
      }) => Notice {
        message: message.clone(),
        hint:    None
      },
      | Some(ApiError::Transport(_)) => {
        Notice {
          message: format!(
            "{action}: could not reach \
             the server"
          ),
          hint:    Some(
            "check api.base_url or \
             --base-url"
          )
        }
      }
      | Some(ApiError::Unauthorized) => {
        Notice {
          message: format!(
            "{action}: not authorized"
          ),
          hint:    None
        }
      }
      | Some(_) => Notice {
        message: action,
        hint:    None
      },
      | None => Notice {
        message: format!("{err:#}"),
        hint:    None
      }
    }
  }
}

impl fmt::Display for Notice {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(f, "{}", self.message)?;
    if let Some(hint) = self.hint {
      write!(f, " ({hint})")?;
    }
    Ok(())
  }
}

/// Pulls a readable message out of an
/// error body: `detail`, `message` or
/// `error` first, then the first
/// non-field or field error.
pub fn server_message(
  body: &Value
) -> Option<String> {
  let Value::Object(map) = body else {
    return match body {
      | Value::String(s)
        if !s.trim().is_empty() =>
      {
        Some(s.trim().to_string())
      }
      | _ => None
    };
  };

  for key in MESSAGE_KEYS {
    if let Some(text) =
      map.get(key).and_then(first_text)
    {
      return Some(text);
    }
  }

  if let Some(text) = map
    .get("non_field_errors")
    .and_then(first_text)
  {
    return Some(text);
  }

  map.iter().find_map(|(field, value)| {
    first_text(value)
      .map(|text| format!("{field}: {text}"))
  })
}

fn first_text(
  value: &Value
) -> Option<String> {
  match value {
    | Value::String(s)
      if !s.trim().is_empty() =>
    {
      Some(s.trim().to_string())
    }
    | Value::Array(items) => {
      items.iter().find_map(first_text)
    }
    | _ => None
  }
}
