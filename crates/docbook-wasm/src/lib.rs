use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsConvertOptions {
    root_element: Option<String>,
    document_id: Option<String>,
    use_ids_in_titles: Option<bool>,
    section_hierarchy: Option<Vec<String>>,
    template: Option<String>,
    compact: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConvertOutput {
    xml: String,
    root_element: String,
    diagnostics: Vec<JsDiagnostic>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsDiagnostic {
    code: String,
    message: String,
    severity: String,
    path: Vec<usize>,
}

#[wasm_bindgen]
pub fn convert_docbook(tree_json: &str) -> Result<JsValue, JsValue> {
    convert_docbook_with_options(tree_json, JsValue::UNDEFINED)
}

#[wasm_bindgen]
pub fn convert_docbook_with_options(tree_json: &str, options: JsValue) -> Result<JsValue, JsValue> {
    let document =
        docbook_core::source_from_json(tree_json).map_err(|err| JsValue::from_str(&err.to_string()))?;
    let convert_options = options_from_js(options)?;
    let result = docbook_core::convert_document(&document, &convert_options)
        .map_err(|err| JsValue::from_str(&err.to_string()))?;

    let diagnostics = result
        .diagnostics
        .into_iter()
        .map(|diag| JsDiagnostic {
            code: diag.code.to_string(),
            message: diag.message,
            severity: diag.severity.label().to_string(),
            path: diag.path.0,
        })
        .collect();

    let output = ConvertOutput {
        xml: result.xml,
        root_element: result.root_element,
        diagnostics,
    };
    serde_wasm_bindgen::to_value(&output).map_err(|err| JsValue::from_str(&err.to_string()))
}

fn options_from_js(value: JsValue) -> Result<docbook_core::ConvertOptions, JsValue> {
    if value.is_null() || value.is_undefined() {
        return Ok(docbook_core::ConvertOptions::default());
    }
    let parsed: JsConvertOptions =
        serde_wasm_bindgen::from_value(value).map_err(|err| JsValue::from_str(&err.to_string()))?;
    let mut out = docbook_core::ConvertOptions::default();
    if let Some(root_element) = parsed.root_element {
        out.root_element = root_element;
    }
    out.document_id = parsed.document_id;
    if let Some(use_ids_in_titles) = parsed.use_ids_in_titles {
        out.use_ids_in_titles = use_ids_in_titles;
    }
    if let Some(tags) = parsed.section_hierarchy {
        out.hierarchy = docbook_core::SectionHierarchy::new(tags);
    }
    out.template = parsed.template;
    if let Some(compact) = parsed.compact {
        out.emit.indent = !compact;
    }
    Ok(out)
}
