//! 元素脚本表
//!
//! 所有注入到页面里的 JS 原文都在这里，按名字索引。
//! 模板中的 `__VALUE__` 会被替换为 JSON 转义后的字符串字面量。

use phf::phf_map;

use crate::browser::ElementScript;

/// 读取标签名
pub const TAG_NAME: &str = "tag_name";
/// 是否可见
pub const IS_VISIBLE: &str = "is_visible";
/// 原生 disabled 属性
pub const IS_ENABLED: &str = "is_enabled";
/// 文本内容
pub const TEXT_CONTENT: &str = "text_content";
/// 填充前聚焦并清空
pub const PREPARE_FILL: &str = "prepare_fill";

static ELEMENT_SCRIPTS: phf::Map<&'static str, &'static str> = phf_map! {
    "tag_name" => r#"function() { return this.tagName.toLowerCase(); }"#,

    "is_visible" => r#"function() {
        const rect = this.getBoundingClientRect();
        const style = window.getComputedStyle(this);
        return rect.width > 0 && rect.height > 0
            && style.visibility !== 'hidden' && style.display !== 'none';
    }"#,

    "is_enabled" => r#"function() { return !this.disabled; }"#,

    "text_content" => r#"function() { return this.textContent; }"#,

    "prepare_fill" => r#"function() {
        this.focus();
        if (this.value !== undefined) { this.value = ''; }
        return true;
    }"#,

    "probe_input_surface" => r#"function() {
        if (this.shadowRoot && this.shadowRoot.querySelector('input')) { return 'shadow'; }
        if (this.querySelector('input')) { return 'child'; }
        if (this.hasAttribute('value') || this.value !== undefined) { return 'direct'; }
        return 'unknown';
    }"#,

    "inject_nested_value" => r#"function() {
        const input = this.shadowRoot && this.shadowRoot.querySelector('input');
        if (!input) { return false; }
        input.focus();
        input.value = '';
        input.value = __VALUE__;
        ['focus', 'input', 'change', 'blur'].forEach(type => {
            input.dispatchEvent(new Event(type, { bubbles: true }));
            this.dispatchEvent(new Event(type, { bubbles: true }));
        });
        input.dispatchEvent(new KeyboardEvent('keydown', { key: 'Tab', bubbles: true }));
        input.dispatchEvent(new KeyboardEvent('keyup', { key: 'Tab', bubbles: true }));
        return true;
    }"#,

    "clear_value" => r#"function() {
        if (this.value !== undefined) { this.value = ''; }
        return true;
    }"#,

    "dispatch_input" => r#"function() {
        this.dispatchEvent(new Event('input', { bubbles: true, cancelable: true }));
        const input = this.shadowRoot && this.shadowRoot.querySelector('input');
        if (input) {
            input.dispatchEvent(new Event('input', { bubbles: true, cancelable: true }));
        }
        return true;
    }"#,

    "finalize_value" => r#"function() {
        const value = __VALUE__;
        const input = this.shadowRoot && this.shadowRoot.querySelector('input');
        if (input) { input.value = value; }
        if (this.value !== undefined) { this.value = value; }
        ['input', 'change', 'blur', 'focusout', 'keyup'].forEach(type => {
            this.dispatchEvent(new Event(type, { bubbles: true, cancelable: true }));
            if (input) { input.dispatchEvent(new Event(type, { bubbles: true, cancelable: true })); }
        });
        this.dispatchEvent(new CustomEvent('validate', { bubbles: true, detail: { value } }));
        this.dispatchEvent(new CustomEvent('valueChanged', { bubbles: true, detail: { value } }));
        return true;
    }"#,

    "retrigger_validation" => r#"function() {
        this.focus();
        const input = this.shadowRoot && this.shadowRoot.querySelector('input');
        if (input) {
            input.value = __VALUE__;
            input.focus();
            input.blur();
        }
        const form = this.closest('form');
        if (form) { form.dispatchEvent(new Event('change', { bubbles: true })); }
        this.dispatchEvent(new KeyboardEvent('keydown', { key: 'Tab', keyCode: 9, bubbles: true }));
        this.dispatchEvent(new KeyboardEvent('keyup', { key: 'Tab', keyCode: 9, bubbles: true }));
        this.dispatchEvent(new CustomEvent('validation', { bubbles: true }));
        this.dispatchEvent(new CustomEvent('fieldValidation', { bubbles: true }));
        return true;
    }"#,

    "assign_value" => r#"function() {
        this.value = __VALUE__;
        this.dispatchEvent(new Event('input', { bubbles: true }));
        this.dispatchEvent(new Event('change', { bubbles: true }));
        return true;
    }"#,

    "script_click" => r#"function() { this.click(); return true; }"#,

    "dispatch_pointer_click" => r#"function() {
        this.dispatchEvent(new MouseEvent('click', { bubbles: true, cancelable: true }));
        return true;
    }"#,
};

/// 按名字取脚本原文
pub fn lookup(name: &str) -> Option<&'static str> {
    ELEMENT_SCRIPTS.get(name).copied()
}

/// 渲染命名脚本为可执行的函数声明
pub fn render(script: &ElementScript) -> String {
    let template = lookup(script.name()).unwrap_or("function() { return null; }");
    match script.value() {
        Some(value) => {
            let literal = serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string());
            template.replace("__VALUE__", &literal)
        }
        None => template.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_named_script_has_source() {
        let scripts = [
            ElementScript::ProbeInputSurface,
            ElementScript::InjectNestedValue { value: "u".into() },
            ElementScript::ClearValue,
            ElementScript::DispatchInput,
            ElementScript::FinalizeValue { value: "u".into() },
            ElementScript::RetriggerValidation { value: "u".into() },
            ElementScript::AssignValue { value: "u".into() },
            ElementScript::ScriptClick,
            ElementScript::DispatchPointerClick,
        ];
        for script in scripts {
            assert!(lookup(script.name()).is_some(), "缺少脚本: {}", script.name());
        }
        for name in [TAG_NAME, IS_VISIBLE, IS_ENABLED, TEXT_CONTENT, PREPARE_FILL] {
            assert!(lookup(name).is_some(), "缺少脚本: {}", name);
        }
    }

    #[test]
    fn test_render_escapes_value() {
        let js = render(&ElementScript::AssignValue {
            value: "o'brien\"; alert(1); //".into(),
        });
        assert!(js.contains(r#"this.value = "o'brien\"; alert(1); //";"#));
        assert!(!js.contains("__VALUE__"));
    }

    #[test]
    fn test_render_without_value_keeps_template() {
        let js = render(&ElementScript::ScriptClick);
        assert_eq!(js, "function() { this.click(); return true; }");
    }
}
