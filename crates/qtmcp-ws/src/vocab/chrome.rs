//! Chrome (`chr.*`) vocabulary (§4.7, §4.8): an accessibility tree with
//! ephemeral per-`read_page` refs, mirroring a browser automation surface closely
//! enough that existing agent harnesses need only swap endpoints.

use super::{parse_params, resolve};
use crate::envelope::ErrorDescriptor;
use qtmcp::input::MouseButton;
use qtmcp::Probe;
use serde::Deserialize;
use serde_json::{json, Value};

pub fn dispatch(probe: &Probe, method: &str, params: &Value) -> Result<Value, ErrorDescriptor> {
  match method {
    "read_page" => read_page(probe, params),
    "click" => click(probe, params),
    "form_input" => form_input(probe, params),
    "get_page_text" => get_page_text(probe),
    "find" => find(probe, params),
    "navigate" => navigate(probe, params),
    "tabs_context" => tabs_context(probe),
    "read_console_messages" => read_console_messages(params),
    other => Err(crate::envelope::standard_error(
      crate::envelope::standard::METHOD_NOT_FOUND,
      format!("unknown chr.* method: {other}"),
    )),
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadPageParams {
  #[serde(default)]
  include_invisible: bool,
}

fn read_page(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: ReadPageParams = parse_params(params)?;
  let nodes = probe.a11y().read_page(p.include_invisible);
  serde_json::to_value(nodes).map_err(|e| crate::envelope::standard_error(crate::envelope::standard::INTERNAL_ERROR, e.to_string()))
}

#[derive(Deserialize)]
struct ClickParams {
  #[serde(rename = "ref")]
  ref_id: u32,
  #[serde(default)]
  button: Option<String>,
}

fn click(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: ClickParams = parse_params(params)?;
  let button = match p.button.as_deref().map(str::to_ascii_lowercase).as_deref() {
    Some("right") => MouseButton::Right,
    Some("middle") => MouseButton::Middle,
    _ => MouseButton::Left,
  };
  probe.a11y().click(p.ref_id, button).map_err(crate::envelope::from_probe_error)?;
  Ok(Value::Null)
}

#[derive(Deserialize)]
struct FormInputParams {
  #[serde(rename = "ref")]
  ref_id: u32,
  value: Value,
}

fn form_input(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: FormInputParams = parse_params(params)?;
  probe.a11y().form_input(p.ref_id, &p.value).map_err(crate::envelope::from_probe_error)?;
  Ok(Value::Null)
}

fn get_page_text(probe: &Probe) -> Result<Value, ErrorDescriptor> {
  Ok(json!(probe.a11y().get_page_text()))
}

#[derive(Deserialize)]
struct FindParams {
  query: String,
}

fn find(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: FindParams = parse_params(params)?;
  serde_json::to_value(probe.a11y().find(&p.query))
    .map_err(|e| crate::envelope::standard_error(crate::envelope::standard::INTERNAL_ERROR, e.to_string()))
}

#[derive(Deserialize)]
struct NavigateParams {
  id: String,
}

fn navigate(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: NavigateParams = parse_params(params)?;
  let handle = resolve(probe, &p.id).map_err(crate::envelope::from_probe_error)?;
  probe.a11y().navigate(handle);
  Ok(Value::Null)
}

fn tabs_context(probe: &Probe) -> Result<Value, ErrorDescriptor> {
  let mut registry = probe.registry().lock();
  let tabs = probe.a11y().tabs_context(&mut registry);
  serde_json::to_value(tabs).map_err(|e| crate::envelope::standard_error(crate::envelope::standard::INTERNAL_ERROR, e.to_string()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsoleMessagesParams {
  #[serde(default)]
  level: Option<String>,
  #[serde(default)]
  pattern: Option<String>,
  #[serde(default)]
  limit: Option<usize>,
}

fn read_console_messages(params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: ConsoleMessagesParams = parse_params(params)?;
  let messages = qtmcp::a11y::console::read(p.level.as_deref(), p.pattern.as_deref(), p.limit);
  serde_json::to_value(messages).map_err(|e| crate::envelope::standard_error(crate::envelope::standard::INTERNAL_ERROR, e.to_string()))
}
