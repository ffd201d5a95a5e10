//! 注入页面的脚本：DOM 快照、变更监听、点击与下拉选择
//!
//! 快照为可交互元素分配递增的 mmid 属性（已存在则复用，保证同一页面内 ID 稳定），
//! 每行输出一个元素，模型通过 mmid 定位元素。

use crate::tools::DomMode;

/// 可交互元素快照。`__MODE__` 替换为 "all_fields" 或 "input_fields"
const SNAPSHOT_JS: &str = r#"
(() => {
  const MODE = '__MODE__';
  const SKIP = new Set(['SCRIPT', 'STYLE', 'NOSCRIPT', 'SVG', 'LINK', 'META']);
  const INPUTS = ['input', 'textarea', 'select', 'button'];
  const INTERACTIVE = INPUTS.concat(['a', 'option', 'summary']);
  const lines = [];
  const seen = new Set();
  let next = 0;
  document.querySelectorAll('[mmid]').forEach(el => {
    next = Math.max(next, parseInt(el.getAttribute('mmid'), 10) + 1 || next);
  });

  function visible(el) {
    if (el.tagName === 'OPTION') return true;
    const s = getComputedStyle(el);
    return s.display !== 'none' && s.visibility !== 'hidden' && el.getClientRects().length > 0;
  }

  function label(el) {
    return (el.getAttribute('aria-label') || el.innerText || el.value || el.placeholder || '')
      .trim().replace(/\s+/g, ' ').slice(0, 80);
  }

  function walk(node, depth) {
    if (depth > 40) return;
    for (const el of node.children) {
      if (SKIP.has(el.tagName) || !visible(el)) continue;
      const tag = el.tagName.toLowerCase();
      const role = el.getAttribute('role');
      const interactive = (MODE === 'input_fields' ? INPUTS : INTERACTIVE).includes(tag)
        || (MODE === 'all_fields' && (role === 'button' || role === 'link' || role === 'tab'
          || role === 'menuitem' || role === 'option' || el.isContentEditable));
      if (interactive) {
        if (!el.hasAttribute('mmid')) el.setAttribute('mmid', String(next++));
        let line = '[' + el.getAttribute('mmid') + '] ' + (role || tag);
        if (tag === 'input') line += ' type=' + (el.type || 'text');
        if (el.name) line += ' name=' + el.name;
        const text = label(el);
        if (text) line += ' "' + text + '"';
        if (el.getAttribute('aria-expanded')) line += ' expanded=' + el.getAttribute('aria-expanded');
        if (tag === 'a' && el.getAttribute('href')) line += ' href=' + el.getAttribute('href').slice(0, 120);
        lines.push(line);
      } else if (MODE === 'all_fields' && el.children.length === 0) {
        const text = (el.innerText || '').trim().replace(/\s+/g, ' ');
        if (text.length > 1 && !seen.has(text)) {
          seen.add(text);
          lines.push('  "' + text.slice(0, 200) + '"');
        }
      }
      walk(el, depth + 1);
    }
  }

  if (document.body) walk(document.body, 0);
  return lines.join('\n');
})()
"#;

/// 安装 MutationObserver，记录新增且可见的元素；重复安装时只清空记录
pub const WATCH_MUTATIONS_JS: &str = r#"
(() => {
  window.__webpilotAdded = [];
  if (window.__webpilotObserver || !document.body) return true;
  window.__webpilotObserver = new MutationObserver(records => {
    for (const r of records) {
      for (const n of r.addedNodes) {
        if (n.nodeType !== 1) continue;
        const text = (n.innerText || '').trim().replace(/\s+/g, ' ');
        if (text) window.__webpilotAdded.push(n.tagName.toLowerCase() + ': ' + text.slice(0, 120));
      }
    }
  });
  window.__webpilotObserver.observe(document.body, { childList: true, subtree: true });
  return true;
})()
"#;

/// 取出并清空新增元素记录（JSON 数组字符串）
pub const TAKE_MUTATIONS_JS: &str = r#"
(() => {
  const added = window.__webpilotAdded || [];
  window.__webpilotAdded = [];
  return JSON.stringify(added);
})()
"#;

pub const READY_STATE_JS: &str = "document.readyState";

/// 返回 JS 字符串字面量（带引号与转义），用于把选择器/文本安全地拼进脚本
pub fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

pub fn snapshot_script(mode: DomMode) -> String {
    SNAPSHOT_JS.replace("__MODE__", mode.as_str())
}

/// 元素概要：JSON {tag, outer_html, value}；元素不存在时返回 null
pub fn element_info_script(selector: &str) -> String {
    format!(
        r#"(() => {{
  const el = document.querySelector({sel});
  if (!el) return null;
  return JSON.stringify({{ tag: el.tagName.toLowerCase(), outer_html: el.outerHTML.slice(0, 500),
    value: (el.value === undefined || el.value === null) ? null : String(el.value) }});
}})()"#,
        sel = js_string(selector)
    )
}

pub fn scroll_into_view_script(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); if (el) el.scrollIntoView({{ block: 'center' }}); return !!el; }})()",
        js_string(selector)
    )
}

pub fn clear_value_script(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); if (!el) return false; el.value = ''; return true; }})()",
        js_string(selector)
    )
}

pub fn focus_script(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); if (!el) return false; el.focus(); return true; }})()",
        js_string(selector)
    )
}

pub fn dispatch_change_script(selector: &str) -> String {
    format!(
        r#"(() => {{
  const el = document.querySelector({});
  if (!el) return false;
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return true;
}})()"#,
        js_string(selector)
    )
}

/// 点击脚本：链接强制在当前标签页打开；返回 JSON {message, expanded}
pub fn click_script(selector: &str) -> String {
    format!(
        r#"(() => {{
  const selector = {sel};
  const el = document.querySelector(selector);
  if (!el) return JSON.stringify({{ missing: true }});
  if (el.tagName.toLowerCase() === 'a') {{
    el.target = '_self';
    el.removeAttribute('target');
    el.removeAttribute('rel');
  }}
  const before = el.getAttribute('aria-expanded');
  el.click();
  const after = el.getAttribute('aria-expanded');
  return JSON.stringify({{
    message: 'Executed JavaScript Click on element with selector: ' + selector,
    expanded: before === 'false' && after === 'true'
  }});
}})()"#,
        sel = js_string(selector)
    )
}

/// 选中 option：设置父 select 的值并触发 change，返回 option 的 value
pub fn select_option_script(selector: &str) -> String {
    format!(
        r#"(() => {{
  const el = document.querySelector({});
  if (!el || !el.parentElement) return null;
  el.parentElement.value = el.value;
  el.parentElement.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return String(el.value);
}})()"#,
        js_string(selector)
    )
}

/// 截断过长快照（按字符计）
pub fn truncate(text: String, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}\n... [truncated, {} total chars]", head, total)
}
