use serde::Serialize;

#[derive(Serialize)]
pub struct Text<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Text<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            kind: "Text",
            text,
            size: None,
            bold: None,
            content_description: None,
        }
    }

    pub fn size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = Some(true);
        self
    }
}

#[derive(Serialize)]
pub struct Button<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    pub action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Button<'a> {
    pub fn new(text: &'a str, action: &'a str) -> Self {
        Self {
            kind: "Button",
            text,
            action,
            id: None,
            selected: None,
            payload: None,
            content_description: None,
        }
    }

    pub fn id(mut self, id: &'a str) -> Self {
        self.id = Some(id);
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = Some(selected);
        self
    }

    /// Extra fields the host echoes back in the command.
    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[derive(Serialize)]
pub struct Column<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,
    pub children: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Column<'a> {
    pub fn new(children: Vec<serde_json::Value>) -> Self {
        Self {
            kind: "Column",
            padding: None,
            children,
            content_description: None,
        }
    }

    pub fn content_description(mut self, cd: &'a str) -> Self {
        self.content_description = Some(cd);
        self
    }
}

#[derive(Serialize)]
pub struct Grid<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub children: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Grid<'a> {
    pub fn new(children: Vec<serde_json::Value>) -> Self {
        Self {
            kind: "Grid",
            children,
            columns: None,
            content_description: None,
        }
    }

    pub fn columns(mut self, cols: u32) -> Self {
        self.columns = Some(cols);
        self
    }

    pub fn content_description(mut self, cd: &'a str) -> Self {
        self.content_description = Some(cd);
        self
    }
}

#[derive(Serialize)]
pub struct Card<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub children: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,
}

impl<'a> Card<'a> {
    pub fn new(children: Vec<serde_json::Value>) -> Self {
        Self {
            kind: "Card",
            children,
            title: None,
            padding: None,
        }
    }

    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = Some(padding);
        self
    }
}

#[derive(Serialize)]
pub struct TextInput<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub bind_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl<'a> TextInput<'a> {
    pub fn new(bind_key: &'a str) -> Self {
        Self {
            kind: "TextInput",
            bind_key,
            hint: None,
            input_type: None,
            required: None,
        }
    }

    pub fn hint(mut self, hint: &'a str) -> Self {
        self.hint = Some(hint);
        self
    }

    /// `text`, `email` or `password`.
    pub fn input_type(mut self, input_type: &'a str) -> Self {
        self.input_type = Some(input_type);
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }
}

/// A file chooser. The host sends `action` with `path` set to the choice.
#[derive(Serialize)]
pub struct FilePicker<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub action: &'a str,
    pub accept: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<&'a str>,
}

impl<'a> FilePicker<'a> {
    pub fn new(action: &'a str, accept: &'a str) -> Self {
        Self {
            kind: "FilePicker",
            action,
            accept,
            selected: None,
        }
    }

    pub fn selected(mut self, selected: Option<&'a str>) -> Self {
        self.selected = selected;
        self
    }
}

#[derive(Serialize)]
pub struct Link<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    pub action: &'a str,
}

impl<'a> Link<'a> {
    pub fn new(text: &'a str, action: &'a str) -> Self {
        Self {
            kind: "Link",
            text,
            action,
        }
    }
}

/// Embedded PDF preview.
#[derive(Serialize)]
pub struct PdfViewer<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub source: &'a str,
    pub height: u32,
}

impl<'a> PdfViewer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            kind: "PdfViewer",
            source,
            height: 400,
        }
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }
}

#[derive(Serialize)]
pub struct Alert<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
}

impl<'a> Alert<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            kind: "Alert",
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_input_skips_unset_fields() {
        let val = serde_json::to_value(TextInput::new("email").input_type("email")).unwrap();
        assert_eq!(val.get("type").and_then(|v| v.as_str()), Some("TextInput"));
        assert_eq!(val.get("input_type").and_then(|v| v.as_str()), Some("email"));
        assert!(val.get("hint").is_none());
        assert!(val.get("required").is_none());
    }

    #[test]
    fn button_payload_is_inlined_as_object() {
        let val = serde_json::to_value(
            Button::new("Add Signature", "overlay_open")
                .payload(serde_json::json!({"path": "uploads/a.pdf"})),
        )
        .unwrap();
        assert_eq!(
            val.pointer("/payload/path").and_then(|v| v.as_str()),
            Some("uploads/a.pdf")
        );
    }

    #[test]
    fn pdf_viewer_defaults_to_400_high() {
        let val = serde_json::to_value(PdfViewer::new("http://x/a.pdf")).unwrap();
        assert_eq!(val.get("height").and_then(|v| v.as_u64()), Some(400));
    }
}
