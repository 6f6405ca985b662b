//! Kamodo JSON-lines driver
//!
//! Reads one request per line from stdin and writes one response per line
//! to stdout. Logs go to stderr.
//!
//! Methods:
//! - set: register an expression under a key
//! - get: summary of one entry
//! - delete: remove an entry (`force` retires it even with dependents)
//! - evaluate: call an entry with named arguments
//! - detail: the four-column summary table
//! - latex: one equation per entry
//! - help: alias of `get`
//! - list: every key form

use std::io::{self, BufRead, Write};

use indexmap::IndexMap;
use kamodo::{Array, DeleteMode, Kamodo, KamodoConfig, KamodoError, Registry};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<JsonValue>,
    method: String,
    #[serde(default)]
    params: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<String>,
}

impl From<KamodoError> for ErrorBody {
    fn from(err: KamodoError) -> Self {
        Self { code: err.code, message: err.message, suggestion: err.suggestion }
    }
}

/// Argument value: a number, a flat list, or a shaped array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArgValue {
    Scalar(f64),
    List(Vec<f64>),
    Shaped { data: Vec<f64>, shape: Vec<usize> },
}

impl ArgValue {
    fn into_array(self) -> Result<Array, KamodoError> {
        match self {
            ArgValue::Scalar(v) => Ok(Array::scalar(v)),
            ArgValue::List(v) => Ok(Array::from_vec(v)),
            ArgValue::Shaped { data, shape } => Ok(Array::new(data, shape)?),
        }
    }
}

#[derive(Debug, Deserialize)]
struct KeyParams {
    key: String,
}

#[derive(Debug, Deserialize)]
struct SetParams {
    key: String,
    expression: String,
}

#[derive(Debug, Deserialize)]
struct DeleteParams {
    key: String,
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Deserialize)]
struct EvaluateParams {
    key: String,
    #[serde(default)]
    args: IndexMap<String, ArgValue>,
}

fn params<T: for<'de> Deserialize<'de>>(params: &Option<JsonValue>) -> Result<T, KamodoError> {
    let value = params.clone().unwrap_or_else(|| json!({}));
    serde_json::from_value(value)
        .map_err(|e| KamodoError::new("INVALID_PARAMS", format!("Invalid params: {}", e)))
}

fn to_json<T: Serialize>(value: &T) -> Result<JsonValue, KamodoError> {
    serde_json::to_value(value).map_err(|e| KamodoError::internal(e.to_string()))
}

fn handle_request(kamodo: &mut Kamodo, request: &Request) -> Response {
    let result = dispatch(kamodo, request);
    match result {
        Ok(value) => Response { id: request.id.clone(), result: Some(value), error: None },
        Err(err) => {
            debug!(method = %request.method, error = %err, "request failed");
            Response { id: request.id.clone(), result: None, error: Some(err.into()) }
        }
    }
}

fn dispatch(kamodo: &mut Kamodo, request: &Request) -> Result<JsonValue, KamodoError> {
    match request.method.as_str() {
        "set" => {
            let p: SetParams = params(&request.params)?;
            let entry = kamodo.set(&p.key, p.expression.as_str())?;
            Ok(json!({
                "name": entry.name(),
                "signature": entry.symbol().to_string(),
                "rhs": entry.rhs(),
                "units": entry.units(),
            }))
        }
        "get" | "help" => {
            let p: KeyParams = params(&request.params)?;
            to_json(&kamodo.help(&p.key)?)
        }
        "delete" => {
            let p: DeleteParams = params(&request.params)?;
            let mode = if p.force { DeleteMode::Force } else { DeleteMode::Guarded };
            let removed = kamodo.delete(&p.key, mode)?;
            Ok(json!({ "deleted": removed.name() }))
        }
        "evaluate" => {
            let p: EvaluateParams = params(&request.params)?;
            let mut args = IndexMap::with_capacity(p.args.len());
            for (name, value) in p.args {
                args.insert(name, value.into_array()?);
            }
            to_json(&kamodo.evaluate_named(&p.key, &args)?)
        }
        "detail" => to_json(&kamodo.detail()),
        "latex" => to_json(&kamodo.render_latex()),
        "list" => to_json(&kamodo.keys()),
        other => Err(KamodoError::new("METHOD_NOT_FOUND", format!("Unknown method: {}", other))
            .with_suggestion("Methods: set, get, delete, evaluate, detail, latex, help, list")),
    }
}

fn write_line(response: &Response) -> io::Result<()> {
    let line = serde_json::to_string(response)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", line)?;
    stdout.flush()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let config = KamodoConfig::from_env();
    info!(version = SERVER_VERSION, ?config, "kamodo started");
    let mut kamodo = Kamodo::with_config(config);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "error reading input");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(line) {
            Ok(request) => {
                debug!(method = %request.method, "processing");
                handle_request(&mut kamodo, &request)
            }
            Err(e) => Response {
                id: None,
                result: None,
                error: Some(ErrorBody {
                    code: "PARSE_ERROR".to_string(),
                    message: format!("Invalid request: {}", e),
                    suggestion: None,
                }),
            },
        };

        if let Err(e) = write_line(&response) {
            error!(error = %e, "error writing response");
            break;
        }
    }

    info!("input closed, shutting down");
}
