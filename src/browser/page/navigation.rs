//! Page navigation and document accessors.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{Command, PageCommand};

use super::Page;

// ============================================================================
// Page - Navigation
// ============================================================================

impl Page {
    /// Navigates to a URL.
    ///
    /// Returns once the endpoint has accepted the navigation; it does not
    /// wait for the load event.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `url` is empty
    /// - [`Error::Protocol`] if the endpoint reports a navigation error
    pub async fn goto(&self, url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(Error::invalid_argument("url must not be empty"));
        }

        debug!(url = %url, "Navigating");

        let command = Command::Page(PageCommand::Navigate {
            url: url.to_string(),
        });
        let result = self.send_command(command).await?;

        if let Some(error_text) = result
            .get("errorText")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
        {
            return Err(Error::protocol(format!(
                "Navigation to {url} failed: {error_text}"
            )));
        }

        Ok(())
    }

    /// Reloads the page.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn reload(&self, ignore_cache: bool) -> Result<()> {
        debug!(ignore_cache, "Reloading");

        self.send_command(Command::Page(PageCommand::Reload { ignore_cache }))
            .await?;
        Ok(())
    }

    /// Returns the main frame URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the frame tree has no URL.
    pub async fn url(&self) -> Result<String> {
        let result = self
            .send_command(Command::Page(PageCommand::GetFrameTree))
            .await?;

        result
            .pointer("/frameTree/frame/url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::protocol("Frame tree has no main frame URL"))
    }

    /// Returns the document title.
    ///
    /// # Errors
    ///
    /// Returns an error if evaluation fails.
    pub async fn title(&self) -> Result<String> {
        self.evaluate_string("document.title", "document.title")
            .await
    }

    /// Returns the serialized document (`outerHTML` of the root element).
    ///
    /// # Errors
    ///
    /// Returns an error if evaluation fails.
    pub async fn html(&self) -> Result<String> {
        self.evaluate_string(
            "document.documentElement ? document.documentElement.outerHTML : ''",
            "document HTML",
        )
        .await
    }
}
