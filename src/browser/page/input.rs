//! Element interaction by CSS selector.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{Command, InputCommand, MouseButton, MouseEventType};

use super::Page;
use super::core::require_selector;
use super::script::json_string;

// ============================================================================
// Page - Input
// ============================================================================

impl Page {
    /// Clicks the centre of the first element matching `selector`.
    ///
    /// The element is scrolled into view, then a left-button press and
    /// release are dispatched at its centre.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `selector` is empty
    /// - [`Error::ElementNotFound`] if nothing matches
    pub async fn click(&self, selector: &str) -> Result<()> {
        require_selector(selector)?;
        debug!(selector, "Clicking");

        let script = format!(
            r#"(() => {{
                const el = document.querySelector({selector});
                if (!el) return null;
                el.scrollIntoView({{ block: 'center', inline: 'center' }});
                const box = el.getBoundingClientRect();
                return {{ x: box.x + box.width / 2, y: box.y + box.height / 2 }};
            }})()"#,
            selector = json_string(selector)
        );

        let point = self.evaluate(&script).await?;
        let (x, y) = click_point(&point, selector)?;

        for event_type in [MouseEventType::MousePressed, MouseEventType::MouseReleased] {
            let command = Command::Input(InputCommand::DispatchMouseEvent {
                event_type,
                x,
                y,
                button: MouseButton::Left,
                click_count: 1,
            });
            self.send_command(command).await?;
        }

        Ok(())
    }

    /// Sets the value of the first element matching `selector` to `text`.
    ///
    /// Fires `input` and `change` events so page scripts observe the edit.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `selector` is empty
    /// - [`Error::ElementNotFound`] if nothing matches
    pub async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        require_selector(selector)?;
        debug!(selector, text_len = text.len(), "Typing");

        let script = format!(
            r#"(() => {{
                const el = document.querySelector({selector});
                if (!el) return false;
                if (typeof el.focus === 'function') el.focus();
                el.value = {text};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#,
            selector = json_string(selector),
            text = json_string(text)
        );

        match self.evaluate(&script).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(Error::element_not_found(selector)),
        }
    }

    /// Returns the `textContent` of the first element matching `selector`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `selector` is empty
    /// - [`Error::ElementNotFound`] if nothing matches
    pub async fn text(&self, selector: &str) -> Result<String> {
        require_selector(selector)?;

        let script = format!(
            "(() => {{ const el = document.querySelector({}); return el ? (el.textContent ?? '') : null; }})()",
            json_string(selector)
        );

        match self.evaluate(&script).await? {
            Value::String(text) => Ok(text),
            Value::Null => Err(Error::element_not_found(selector)),
            other => Err(Error::protocol(format!(
                "Expected element text to be a string, got {other}"
            ))),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Reads the `{x, y}` centre point returned by the click script.
fn click_point(point: &Value, selector: &str) -> Result<(f64, f64)> {
    if point.is_null() {
        return Err(Error::element_not_found(selector));
    }

    let coordinate = |axis: &str| {
        point
            .get(axis)
            .and_then(Value::as_f64)
            .ok_or_else(|| Error::protocol(format!("Click target has no {axis} coordinate")))
    };

    Ok((coordinate("x")?, coordinate("y")?))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_click_point() {
        let (x, y) = click_point(&json!({"x": 10.5, "y": 20}), "#a").expect("point");
        assert_eq!(x, 10.5);
        assert_eq!(y, 20.0);
    }

    #[test]
    fn test_null_point_is_element_not_found() {
        let err = click_point(&Value::Null, "#missing").unwrap_err();
        assert!(matches!(err, Error::ElementNotFound { ref selector } if selector == "#missing"));
    }

    #[test]
    fn test_malformed_point_is_protocol_error() {
        let err = click_point(&json!({"x": "left"}), "#a").unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }
}
