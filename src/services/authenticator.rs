//! 门户登录 - 业务能力层
//!
//! 两步式登录：账号 → "下一步" → 密码 → 提交。
//! 账号输入框可能是带 shadow DOM 的自定义组件，其校验状态由 JS 监听器驱动，
//! 因此输入和点击都需要分层回退。

use std::path::Path;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::browser::{ElementScript, PageElement, PageSession};
use crate::config::LoginTimings;
use crate::error::{BrowserError, BrowserResult};
use crate::models::{LoginStatus, SessionState};
use crate::services::locator::control_is_enabled;
use crate::services::selectors::LocatorCatalog;

/// URL 中出现即视为仍在登录页
const LOGIN_URL_MARKERS: [&str; 4] = ["signin.adp.com", "online.adp.com/signin", "/login", "/signin"];
/// 页面内容中出现即视为仍在登录页（区分大小写）
const LOGIN_CONTENT_MARKERS: [&str; 2] = ["Password", "Sign In"];
/// 登录后页面的特征（不区分大小写）
const SESSION_MARKERS: [&str; 8] = [
    "dashboard",
    "workforce",
    "home",
    "employee",
    "menu",
    "navigation",
    "logout",
    "sign out",
];

/// 根据 URL 和页面内容判断是否已登录
///
/// 依次检查：登录页标记（否定）、登录后标记（肯定）、是否已离开 signin/login 路径（弱肯定）。
pub fn detect_authenticated(url: &str, content: &str) -> bool {
    if let Some(marker) = LOGIN_URL_MARKERS.iter().find(|m| url.contains(*m)) {
        debug!("仍在登录页 (URL 包含 {})", marker);
        return false;
    }
    if let Some(marker) = LOGIN_CONTENT_MARKERS.iter().find(|m| content.contains(*m)) {
        debug!("仍在登录页 (页面包含 {})", marker);
        return false;
    }

    let url_lower = url.to_lowercase();
    let content_lower = content.to_lowercase();
    if let Some(marker) = SESSION_MARKERS
        .iter()
        .find(|m| url_lower.contains(*m) || content_lower.contains(*m))
    {
        debug!("检测到登录状态 (包含 {})", marker);
        return true;
    }

    !url.contains("signin") && !url.contains("login")
}

/// 读取页面并判断登录状态，读取失败视为未登录
pub async fn is_authenticated(page: &dyn PageSession) -> bool {
    let url = match page.current_url().await {
        Ok(url) => url,
        Err(e) => {
            warn!("无法读取当前 URL: {}", e);
            return false;
        }
    };
    let content = page.content().await.unwrap_or_default();
    let authenticated = detect_authenticated(&url, &content);
    info!("🔎 当前 URL: {} (已登录: {})", url, authenticated);
    authenticated
}

/// 保存诊断截图，失败只记录日志
pub async fn capture_screenshot(page: &dyn PageSession, dir: &Path, name: &str) {
    let path = dir.join(name);
    match page.screenshot(&path).await {
        Ok(_) => info!("📸 截图已保存: {}", path.display()),
        Err(e) => warn!("截图 {} 失败: {}", name, e),
    }
}

/// 一次登录尝试
pub struct Authenticator<'a> {
    page: &'a dyn PageSession,
    catalog: &'a LocatorCatalog,
    timings: &'a LoginTimings,
    screenshot_dir: &'a Path,
}

impl<'a> Authenticator<'a> {
    pub fn new(
        page: &'a dyn PageSession,
        catalog: &'a LocatorCatalog,
        timings: &'a LoginTimings,
        screenshot_dir: &'a Path,
    ) -> Self {
        Self {
            page,
            catalog,
            timings,
            screenshot_dir,
        }
    }

    /// 执行登录
    ///
    /// 已处于登录状态时直接返回成功；等待超时返回 [`LoginStatus::Timeout`]，其余错误返回失败。
    pub async fn login(&self, username: &str, password: &str) -> (LoginStatus, SessionState) {
        info!("🔐 开始登录");

        if is_authenticated(self.page).await {
            info!("✓ 已处于登录状态，跳过登录");
            return (LoginStatus::Success, SessionState::logged_in(self.url().await));
        }

        match self.perform(username, password).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("❌ 登录过程出错: {}", e);
                self.capture("login_error.png").await;
                let status = match e {
                    BrowserError::Timeout(_) => LoginStatus::Timeout,
                    _ => LoginStatus::Failed,
                };
                (status, SessionState::failed(e.to_string()).with_login_status(status))
            }
        }
    }

    async fn perform(
        &self,
        username: &str,
        password: &str,
    ) -> BrowserResult<(LoginStatus, SessionState)> {
        sleep(self.timings.page_settle).await;
        self.capture("login_page_initial.png").await;
        self.dump_inputs().await;

        let Some(user_field) = self.catalog.username.resolve(self.page).await else {
            error!("❌ 尝试所有选择器后仍未找到账号输入框");
            self.capture("no_user_field_found.png").await;
            return Ok(Self::failure("User ID field not found"));
        };
        info!("✓ 找到账号输入框: {}", user_field.selector);
        let user_field = user_field.element;

        self.enter_identifier(user_field.as_ref(), username).await;
        sleep(self.timings.validation_wait).await;
        self.capture("after_username.png").await;

        self.advance_past_identifier(user_field.as_ref(), username)
            .await?;

        let Some(password_field) = self.catalog.password.resolve(self.page).await else {
            error!("❌ 未找到密码输入框");
            self.capture("login_debug.png").await;
            return Ok(Self::failure("Password field not found"));
        };
        info!("✓ 找到密码输入框: {}", password_field.selector);
        let password_field = password_field.element;
        password_field.fill(password).await?;
        sleep(self.timings.after_password).await;

        self.submit(password_field.as_ref()).await?;
        sleep(self.timings.after_submit).await;
        self.page
            .wait_for_network_idle(self.timings.idle_timeout)
            .await?;

        if is_authenticated(self.page).await {
            info!("✅ 登录成功");
            Ok((LoginStatus::Success, SessionState::logged_in(self.url().await)))
        } else {
            error!("❌ 登录失败，页面仍停留在登录页");
            self.capture("login_failed.png").await;
            let state = SessionState {
                is_setup: true,
                current_url: Some(self.url().await),
                is_logged_in: false,
                login_status: Some(LoginStatus::Failed),
                error_message: Some("Login failed - still on login page".to_string()),
            };
            Ok((LoginStatus::Failed, state))
        }
    }

    fn failure(message: &str) -> (LoginStatus, SessionState) {
        (
            LoginStatus::Failed,
            SessionState::failed(message).with_login_status(LoginStatus::Failed),
        )
    }

    async fn url(&self) -> String {
        self.page.current_url().await.unwrap_or_default()
    }

    async fn capture(&self, name: &str) {
        capture_screenshot(self.page, self.screenshot_dir, name).await;
    }

    /// 输出页面上所有 input 的属性，方便门户改版后调整选择器
    async fn dump_inputs(&self) {
        let inputs = match self.page.query_all("input").await {
            Ok(inputs) => inputs,
            Err(e) => {
                debug!("无法枚举输入框: {}", e);
                return;
            }
        };
        info!("页面上共有 {} 个输入框", inputs.len());
        for (i, input) in inputs.iter().enumerate() {
            let attr = |name: &'static str| async move {
                input
                    .attribute(name)
                    .await
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| format!("no-{}", name))
            };
            info!(
                "  输入框 {}: type='{}' name='{}' id='{}' placeholder='{}'",
                i,
                attr("type").await,
                attr("name").await,
                attr("id").await,
                attr("placeholder").await
            );
        }
    }

    /// 输入账号，自定义组件走分层注入，任何一步失败都退回直接赋值
    async fn enter_identifier(&self, field: &dyn PageElement, value: &str) {
        let tag = field.tag_name().await.unwrap_or_default();
        debug!("账号输入框类型: {}", tag);

        let result = if tag.contains('-') {
            info!("处理自定义输入组件 <{}>", tag);
            self.inject_into_custom(field, value).await
        } else {
            field.fill(value).await
        };

        if let Err(e) = result {
            warn!("⚠️ 账号输入失败，改用直接赋值: {}", e);
            let assign = ElementScript::AssignValue {
                value: value.to_string(),
            };
            if let Err(e) = field.run_script(&assign).await {
                warn!("直接赋值也失败: {}", e);
            }
        }
    }

    async fn inject_into_custom(&self, field: &dyn PageElement, value: &str) -> BrowserResult<()> {
        field.click().await?;
        sleep(self.timings.focus_delay).await;

        let surface = field.run_script(&ElementScript::ProbeInputSurface).await?;
        debug!("可编辑表面: {}", surface);

        if surface.as_str() == Some("shadow") {
            field
                .run_script(&ElementScript::InjectNestedValue {
                    value: value.to_string(),
                })
                .await?;
        } else {
            field.run_script(&ElementScript::ClearValue).await?;
            for ch in value.chars() {
                field.type_char(ch, self.timings.char_delay).await?;
                field.run_script(&ElementScript::DispatchInput).await?;
            }
        }

        field
            .run_script(&ElementScript::FinalizeValue {
                value: value.to_string(),
            })
            .await?;
        Ok(())
    }

    /// 点击"下一步"，找不到按钮或所有点击方式都失败时在账号框按回车
    async fn advance_past_identifier(
        &self,
        user_field: &dyn PageElement,
        value: &str,
    ) -> BrowserResult<()> {
        let Some(control) = self.catalog.continue_control.resolve(self.page).await else {
            warn!("⚠️ 未找到\"下一步\"按钮，按回车继续");
            user_field.press_key("Enter").await?;
            sleep(self.timings.validation_wait).await;
            return Ok(());
        };
        info!("✓ 找到\"下一步\"按钮: {}", control.selector);
        let control = control.element;

        if !self.wait_until_enabled(control.as_ref(), user_field, value).await {
            warn!("⚠️ \"下一步\"按钮始终不可用，仍尝试点击");
        }

        if !escalating_click(control.as_ref()).await {
            warn!("⚠️ 所有点击方式均失败，按回车继续");
            user_field.press_key("Enter").await?;
        }
        sleep(self.timings.after_continue).await;
        self.capture("after_next_click.png").await;
        Ok(())
    }

    /// 轮询控件可用状态，每次未通过后重新触发账号框的校验
    async fn wait_until_enabled(
        &self,
        control: &dyn PageElement,
        user_field: &dyn PageElement,
        value: &str,
    ) -> bool {
        let retrigger = ElementScript::RetriggerValidation {
            value: value.to_string(),
        };
        for attempt in 1..=self.timings.enable_poll_attempts {
            if control_is_enabled(control).await {
                debug!("按钮在第 {} 次检查时可用", attempt);
                return true;
            }
            debug!(
                "按钮不可用 ({}/{})，重新触发校验",
                attempt, self.timings.enable_poll_attempts
            );
            sleep(self.timings.enable_poll_delay).await;
            if let Err(e) = user_field.run_script(&retrigger).await {
                debug!("重新触发校验失败: {}", e);
            }
        }
        control_is_enabled(control).await
    }

    async fn submit(&self, password_field: &dyn PageElement) -> BrowserResult<()> {
        match self.catalog.submit.resolve(self.page).await {
            Some(submit) => {
                info!("✓ 找到提交按钮: {}", submit.selector);
                if let Err(e) = submit.element.click().await {
                    warn!("点击提交按钮失败，按回车提交: {}", e);
                    password_field.press_key("Enter").await?;
                }
            }
            None => {
                warn!("⚠️ 未找到提交按钮，按回车提交");
                password_field.press_key("Enter").await?;
            }
        }
        Ok(())
    }
}

/// 依次尝试原生点击、脚本点击、合成鼠标事件，任一成功即返回 true
pub async fn escalating_click(element: &dyn PageElement) -> bool {
    match element.click().await {
        Ok(_) => return true,
        Err(e) => debug!("原生点击失败: {}", e),
    }
    for script in [ElementScript::ScriptClick, ElementScript::DispatchPointerClick] {
        match element.run_script(&script).await {
            Ok(_) => {
                debug!("通过 {} 完成点击", script.name());
                return true;
            }
            Err(e) => debug!("{} 失败: {}", script.name(), e),
        }
    }
    false
}
