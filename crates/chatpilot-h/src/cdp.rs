use chatpilot_engine::backend::LaunchOptions;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;

pub struct CdpClient {
    pub browser: Browser,
    pub handler_task: JoinHandle<()>,
    pub page: Page,
}

impl CdpClient {
    /// Launch Chromium on a persistent profile and pick the page to drive.
    pub async fn launch(
        options: &LaunchOptions,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let mut config_builder = BrowserConfig::builder()
            .no_sandbox()
            .user_data_dir(&options.profile_dir)
            .window_size(options.viewport_width, options.viewport_height)
            .viewport(Viewport {
                width: options.viewport_width,
                height: options.viewport_height,
                ..Viewport::default()
            });

        if options.headless {
            tracing::info!("Launching browser in headless mode");
        } else {
            tracing::info!("Launching browser in visible mode");
            config_builder = config_builder.with_head();
        }

        // Config value wins over the CHROME_BIN environment variable
        let chrome_bin = options
            .chrome_bin
            .clone()
            .or_else(|| std::env::var_os("CHROME_BIN").map(Into::into));
        if let Some(chrome_bin) = chrome_bin {
            tracing::info!("Using custom Chrome binary: {}", chrome_bin.display());
            config_builder = config_builder.chrome_executable(chrome_bin);
        }

        let (browser, mut handler) = Browser::launch(
            config_builder
                .build()
                .map_err(|e| format!("Failed to build browser config: {}", e))?,
        )
        .await
        .map_err(|e| format!("Failed to launch browser: {}", e))?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(e) = h {
                    tracing::debug!("Browser handler error (ignoring): {}", e);
                    continue;
                }
            }
            tracing::info!("Browser handler task ended");
        });

        // A restored profile may already have a tab open
        let existing = browser
            .pages()
            .await
            .map_err(|e| format!("Failed to list pages: {}", e))?;
        let page = match existing.into_iter().next() {
            Some(page) => {
                tracing::info!("Reusing page already open in the profile");
                page
            }
            None => browser
                .new_page("about:blank")
                .await
                .map_err(|e| format!("Failed to create page: {}", e))?,
        };

        let mut console_events = page
            .event_listener::<chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled>()
            .await
            .map_err(|e| format!("Failed to subscribe to console events: {}", e))?;

        tokio::spawn(async move {
            while let Some(event) = console_events.next().await {
                let text = event
                    .args
                    .iter()
                    .filter_map(|arg| arg.description.as_deref())
                    .collect::<Vec<_>>()
                    .join(" ");
                tracing::trace!(target: "chatpilot::page", "console.{:?}: {}", event.r#type, text);
            }
        });

        // Dialogs block the page's JS thread, so every wait would time out
        let mut dialog_events = page
            .event_listener::<chromiumoxide::cdp::browser_protocol::page::EventJavascriptDialogOpening>()
            .await
            .map_err(|e| format!("Failed to subscribe to dialog events: {}", e))?;

        let page_clone = page.clone();
        tokio::spawn(async move {
            while let Some(event) = dialog_events.next().await {
                tracing::info!(
                    "Accepting JavaScript dialog: {} ({:?})",
                    event.message,
                    event.r#type
                );
                let cmd =
                    chromiumoxide::cdp::browser_protocol::page::HandleJavaScriptDialogParams::new(
                        true,
                    );
                if let Err(e) = page_clone.execute(cmd).await {
                    tracing::error!("Failed to accept dialog: {}", e);
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
            page,
        })
    }

    /// Whether the CDP connection is still being serviced.
    pub fn is_alive(&self) -> bool {
        !self.handler_task.is_finished()
    }

    pub async fn close(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.browser
            .close()
            .await
            .map_err(|e| format!("Error closing browser: {}", e))?;
        self.handler_task
            .await
            .map_err(|e| format!("Error awaiting handler: {}", e))?;
        Ok(())
    }
}
