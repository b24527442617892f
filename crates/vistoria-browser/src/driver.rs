use crate::console_capture::ConsoleCapture;
use crate::{js, Error, Result};
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EnableParams as RuntimeEnableParams;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::Path;
use std::process::Child;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use vistoria_core::{ConsoleMessage, Selector, Viewport};

const CONNECT_RETRIES: usize = 5;
const CONNECT_BACKOFF: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Element state a bounded wait can target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    Visible,
    Hidden,
    HasClass(String),
    NotClass(String),
}

impl WaitCondition {
    fn expression(&self, selector: &Selector) -> String {
        match self {
            WaitCondition::Visible => js::is_visible(selector),
            WaitCondition::Hidden => js::is_hidden(selector),
            WaitCondition::HasClass(class) => js::has_class(selector, class, true),
            WaitCondition::NotClass(class) => js::has_class(selector, class, false),
        }
    }
}

/// How to answer the next native dialog.
#[derive(Debug, Clone, Default)]
struct DialogDirective {
    accept: bool,
    prompt_text: Option<String>,
}

/// A connected CDP session driving one page of a Chrome process this
/// harness launched. Owns the process; `close` (or drop) releases it.
#[derive(Debug)]
pub struct Driver {
    child: Option<Child>,
    browser: Browser,
    handler_task: JoinHandle<()>,
    dialog_task: JoinHandle<()>,
    dialog_directive: Arc<Mutex<Option<DialogDirective>>>,
    console: ConsoleCapture,
    page: Page,
    // Keeps a temporary profile directory alive until teardown.
    profile: Option<crate::ProfileManager>,
}

impl Driver {
    /// Connect to a freshly launched Chrome over the debugging port.
    ///
    /// Chrome may not be ready to accept the websocket immediately after
    /// spawn, so the connection is retried with a short backoff. When the
    /// session cannot be established the child is killed and reaped before
    /// the error is returned; a failed attach never leaves a Chrome process
    /// behind.
    pub async fn attach(mut child: Child, debugging_port: u16) -> Result<Self> {
        let (browser, handler_task) = match Self::connect(debugging_port).await {
            Ok(session) => session,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };

        match Self::open_page(&browser).await {
            Ok((page, console, dialog_task, dialog_directive)) => Ok(Self {
                child: Some(child),
                browser,
                handler_task,
                dialog_task,
                dialog_directive,
                console,
                page,
                profile: None,
            }),
            Err(e) => {
                handler_task.abort();
                let _ = child.kill();
                let _ = child.wait();
                Err(e)
            }
        }
    }

    async fn connect(debugging_port: u16) -> Result<(Browser, JoinHandle<()>)> {
        let ws_url = format!("http://localhost:{}", debugging_port);

        let (browser, mut handler) = {
            let mut retries = CONNECT_RETRIES;
            loop {
                tracing::debug!("Attempting CDP connection to {}...", ws_url);
                match Browser::connect(&ws_url).await {
                    Ok(result) => {
                        tracing::info!("CDP connection established");
                        break result;
                    }
                    Err(e) => {
                        retries -= 1;
                        if retries == 0 {
                            return Err(Error::Cdp(format!(
                                "Failed to connect to Chrome after {} attempts: {}",
                                CONNECT_RETRIES, e
                            )));
                        }
                        tracing::info!(
                            "CDP connection attempt failed, retrying... ({} left)",
                            retries
                        );
                        tokio::time::sleep(CONNECT_BACKOFF).await;
                    }
                }
            }
        };

        // The handler task must run for any CDP command to complete.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error (continuing): {}", e);
                }
            }
        });

        Ok((browser, handler_task))
    }

    async fn open_page(
        browser: &Browser,
    ) -> Result<(
        Page,
        ConsoleCapture,
        JoinHandle<()>,
        Arc<Mutex<Option<DialogDirective>>>,
    )> {
        // Give Chrome a moment to create its initial target.
        tokio::time::sleep(Duration::from_millis(500)).await;

        let page = if let Some(page) = browser.pages().await?.first() {
            page.clone()
        } else {
            browser.new_page("about:blank").await?
        };

        page.execute(RuntimeEnableParams::default()).await?;
        let console = ConsoleCapture::attach(&page).await?;

        let (dialog_task, dialog_directive) = match Self::spawn_dialog_handler(&page).await {
            Ok(handler) => handler,
            Err(e) => {
                console.stop();
                return Err(e);
            }
        };

        Ok((page, console, dialog_task, dialog_directive))
    }

    /// Take ownership of the profile guard so its directory outlives the run.
    pub fn hold_profile(&mut self, profile: crate::ProfileManager) {
        self.profile = Some(profile);
    }

    /// One-shot visibility probe, used for the already-logged-in fast path.
    pub async fn is_visible(&self, selector: &Selector) -> Result<bool> {
        self.eval_bool(&js::is_visible(selector)).await
    }

    /// Answer native dialogs as they open. Unarmed dialogs are dismissed so
    /// a stray confirm() cannot hang the run.
    async fn spawn_dialog_handler(
        page: &Page,
    ) -> Result<(JoinHandle<()>, Arc<Mutex<Option<DialogDirective>>>)> {
        let mut dialogs = page.event_listener::<EventJavascriptDialogOpening>().await?;
        let directive: Arc<Mutex<Option<DialogDirective>>> = Arc::default();

        let armed = directive.clone();
        let page = page.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = dialogs.next().await {
                let directive = armed
                    .lock()
                    .ok()
                    .and_then(|mut slot| slot.take())
                    .unwrap_or_default();
                tracing::debug!(
                    "Dialog opened ({:?}): {:?} -> accept={}",
                    event.r#type,
                    event.message,
                    directive.accept
                );

                let mut params = HandleJavaScriptDialogParams::new(directive.accept);
                params.prompt_text = directive.prompt_text;
                if let Err(e) = page.execute(params).await {
                    tracing::warn!("Failed to handle dialog: {}", e);
                }
            }
        });

        Ok((task, directive))
    }

    /// Arm auto-accept for the next dialog, optionally answering a prompt.
    pub fn arm_dialog(&self, prompt_text: Option<String>) {
        if let Ok(mut slot) = self.dialog_directive.lock() {
            *slot = Some(DialogDirective {
                accept: true,
                prompt_text,
            });
        }
    }

    /// Apply the scenario viewport, including mobile emulation.
    pub async fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                viewport.width as i64,
                viewport.height as i64,
                1.0,
                viewport.mobile,
            ))
            .await?;
        Ok(())
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        tracing::info!("goto {}", url);
        self.page.goto(url).await?;
        self.page.wait_for_navigation().await?;
        Ok(())
    }

    /// Resolve a selector to a CSS query usable by CDP element commands.
    /// Role selectors are matched in-page and handed back via a tag
    /// attribute; the tag is removed once the interaction completes.
    async fn resolve(&self, selector: &Selector) -> Result<String> {
        match selector {
            Selector::Css { css } => Ok(css.clone()),
            Selector::Role { .. } => {
                if self.eval_bool(&js::tag_first(selector)).await? {
                    Ok(format!("[{}]", js::HIT_ATTR))
                } else {
                    Err(Error::NoSuchElement(selector.to_string()))
                }
            }
        }
    }

    async fn clear_resolution(&self, selector: &Selector) {
        if matches!(selector, Selector::Role { .. }) {
            let _ = self.page.evaluate(js::clear_tags()).await;
        }
    }

    pub async fn click(&self, selector: &Selector) -> Result<()> {
        tracing::info!("click {}", selector);
        let css = self.resolve(selector).await?;
        let result = match self.page.find_element(css).await {
            Ok(element) => element.click().await.map(|_| ()).map_err(Error::from),
            Err(_) => Err(Error::NoSuchElement(selector.to_string())),
        };
        self.clear_resolution(selector).await;
        result
    }

    pub async fn fill(&self, selector: &Selector, value: &str) -> Result<()> {
        tracing::info!("fill {} = {:?}", selector, value);
        if self.eval_bool(&js::fill(selector, value)).await? {
            Ok(())
        } else {
            Err(Error::NoSuchElement(selector.to_string()))
        }
    }

    pub async fn select_option(&self, selector: &Selector, value: &str) -> Result<()> {
        tracing::info!("select {} = {:?}", selector, value);
        if self.eval_bool(&js::select_option(selector, value)).await? {
            Ok(())
        } else {
            Err(Error::NoSuchElement(selector.to_string()))
        }
    }

    pub async fn set_checked(&self, selector: &Selector, checked: bool) -> Result<()> {
        tracing::info!("set_checked {} = {}", selector, checked);
        if self.eval_bool(&js::set_checked(selector, checked)).await? {
            Ok(())
        } else {
            Err(Error::NoSuchElement(selector.to_string()))
        }
    }

    pub async fn evaluate(&self, expression: &str) -> Result<()> {
        self.page.evaluate(expression.to_string()).await?;
        Ok(())
    }

    /// Poll the page until the element reaches the condition, bounded by
    /// `timeout_ms`.
    pub async fn wait_for(
        &self,
        selector: &Selector,
        condition: &WaitCondition,
        timeout_ms: u64,
    ) -> Result<()> {
        let what = format!("{} to be {}", selector, describe(condition));
        tracing::info!("wait for {}", what);
        let expr = condition.expression(selector);
        self.poll_until(&expr, what, timeout_ms).await
    }

    /// Bounded-wait text assertion: passes as soon as the element's text
    /// satisfies the check; fails with the last observed text on timeout.
    pub async fn assert_text<F>(
        &self,
        selector: &Selector,
        check: F,
        expectation: &str,
        timeout_ms: u64,
    ) -> Result<()>
    where
        F: Fn(&str) -> bool,
    {
        tracing::info!("assert {} {}", selector, expectation);
        let expr = js::text_content(selector);
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        let mut last_text: Option<String> = None;

        loop {
            if let Some(text) = self.eval_string(&expr).await? {
                if check(&text) {
                    return Ok(());
                }
                last_text = Some(text);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Assertion(match last_text {
                    Some(text) => format!(
                        "{} {}; last text was {:?}",
                        selector,
                        expectation,
                        text.trim()
                    ),
                    None => format!("{} {}; element not found", selector, expectation),
                }));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Bounded-wait count assertion.
    pub async fn assert_count(
        &self,
        selector: &Selector,
        expected: usize,
        timeout_ms: u64,
    ) -> Result<()> {
        tracing::info!("assert count {} == {}", selector, expected);
        let expr = js::count(selector);
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        let mut last = 0u64;

        loop {
            if let Some(count) = self.eval_u64(&expr).await? {
                if count == expected as u64 {
                    return Ok(());
                }
                last = count;
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Assertion(format!(
                    "expected {} elements matching {}, found {}",
                    expected, selector, last
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Full-page (or viewport) screenshot written to `path` before returning.
    pub async fn screenshot(&self, path: &Path, full_page: bool) -> Result<()> {
        tracing::info!("screenshot -> {}", path.display());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.page
            .save_screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(full_page)
                    .build(),
                path,
            )
            .await?;
        Ok(())
    }

    /// Screenshot scoped to one element.
    pub async fn element_screenshot(&self, selector: &Selector, path: &Path) -> Result<()> {
        tracing::info!("element screenshot {} -> {}", selector, path.display());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let css = self.resolve(selector).await?;
        let result = match self.page.find_element(css).await {
            Ok(element) => element
                .save_screenshot(CaptureScreenshotFormat::Png, path)
                .await
                .map(|_| ())
                .map_err(Error::from),
            Err(_) => Err(Error::NoSuchElement(selector.to_string())),
        };
        self.clear_resolution(selector).await;
        result
    }

    /// The page's rendered HTML, for failure diagnostics.
    pub async fn page_html(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    pub fn console_messages(&self) -> Vec<ConsoleMessage> {
        self.console.messages()
    }

    async fn poll_until(&self, expr: &str, what: String, timeout_ms: u64) -> Result<()> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            // Evaluation errors during navigation are treated as "not yet".
            if matches!(self.eval_bool(expr).await, Ok(true)) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Timeout { what, timeout_ms });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn eval_bool(&self, expr: &str) -> Result<bool> {
        let result = self.page.evaluate(expr.to_string()).await?;
        Ok(result.value().and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn eval_string(&self, expr: &str) -> Result<Option<String>> {
        let result = self.page.evaluate(expr.to_string()).await?;
        Ok(result
            .value()
            .and_then(|v| v.as_str())
            .map(String::from))
    }

    async fn eval_u64(&self, expr: &str) -> Result<Option<u64>> {
        let result = self.page.evaluate(expr.to_string()).await?;
        Ok(result.value().and_then(|v| v.as_u64()))
    }

    /// Tear down the browser. Runs on every exit path via the runner; the
    /// `Drop` impl is only the backstop for early returns.
    pub async fn close(mut self) -> Result<()> {
        tracing::info!("Closing browser");
        if let Err(e) = self.browser.close().await {
            tracing::debug!("Browser.close failed (killing process): {}", e);
        }
        self.console.stop();
        self.dialog_task.abort();
        self.handler_task.abort();

        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        Ok(())
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.console.stop();
        self.dialog_task.abort();
        self.handler_task.abort();
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn describe(condition: &WaitCondition) -> String {
    match condition {
        WaitCondition::Visible => "visible".to_string(),
        WaitCondition::Hidden => "hidden".to_string(),
        WaitCondition::HasClass(class) => format!("class '{}'", class),
        WaitCondition::NotClass(class) => format!("without class '{}'", class),
    }
}
