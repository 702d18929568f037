// Merge tag substitution in filter values: {user:ID}, {form_id}, {date_mdy}, ...

use crate::models::{Form, ViewerContext};
use chrono::NaiveDate;

/// Replace known merge tags in `text`. Unknown tags are left as written;
/// user tags resolve to "" for a logged-out viewer.
pub fn resolve_merge_tags(text: &str, form: Option<&Form>, viewer: &ViewerContext, today: NaiveDate) -> String {
    if !text.contains('{') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let Some(end) = tail.find('}') else {
            out.push_str(tail);
            return out;
        };
        let tag = &tail[1..end];
        // "{{user:ID}" resolves the inner tag
        if let Some(inner) = tag.rfind('{') {
            out.push_str(&tail[..=inner]);
            push_tag(&mut out, &tag[inner + 1..], &tail[inner + 1..=end], form, viewer, today);
        } else {
            push_tag(&mut out, tag, &tail[..=end], form, viewer, today);
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}

fn push_tag(out: &mut String, tag: &str, raw: &str, form: Option<&Form>, viewer: &ViewerContext, today: NaiveDate) {
    match resolve_tag(tag, form, viewer, today) {
        Some(value) => out.push_str(&value),
        None => out.push_str(raw),
    }
}

fn resolve_tag(tag: &str, form: Option<&Form>, viewer: &ViewerContext, today: NaiveDate) -> Option<String> {
    if let Some(property) = tag.strip_prefix("user:") {
        let logged_in = viewer.is_logged_in();
        let value = match property {
            "ID" | "id" => viewer.user_id.map(|id| id.to_string()).unwrap_or_default(),
            "user_login" => viewer.login.clone(),
            "display_name" => viewer.display_name.clone(),
            "user_email" => viewer.email.clone(),
            _ => return None,
        };
        return Some(if logged_in { value } else { String::new() });
    }

    match tag {
        "form_id" => form.map(|f| f.id.to_string()),
        "form_title" => form.map(|f| f.title.clone()),
        "date_mdy" => Some(today.format("%m/%d/%Y").to_string()),
        "date_dmy" => Some(today.format("%d/%m/%Y").to_string()),
        "date_ymd" => Some(today.format("%Y-%m-%d").to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()
    }

    fn viewer() -> ViewerContext {
        let mut viewer = ViewerContext::user(42);
        viewer.login = "ana".to_string();
        viewer.display_name = "Ana Silva".to_string();
        viewer.email = "ana@example.com".to_string();
        viewer
    }

    #[test]
    fn test_user_tags() {
        let v = viewer();
        assert_eq!(resolve_merge_tags("{user:ID}", None, &v, today()), "42");
        assert_eq!(resolve_merge_tags("by {user:display_name} <{user:user_email}>", None, &v, today()), "by Ana Silva <ana@example.com>");
        assert_eq!(resolve_merge_tags("{user:user_login}", None, &ViewerContext::anonymous(), today()), "");
    }

    #[test]
    fn test_form_and_date_tags() {
        let form = Form::new(5, "Signups");
        let v = ViewerContext::anonymous();
        assert_eq!(resolve_merge_tags("{form_id}-{form_title}", Some(&form), &v, today()), "5-Signups");
        assert_eq!(resolve_merge_tags("{date_mdy}", None, &v, today()), "03/07/2026");
        assert_eq!(resolve_merge_tags("{date_dmy}", None, &v, today()), "07/03/2026");
        assert_eq!(resolve_merge_tags("{date_ymd}", None, &v, today()), "2026-03-07");
    }

    #[test]
    fn test_unknown_and_unterminated_tags_kept() {
        let v = viewer();
        assert_eq!(resolve_merge_tags("{user:password} {custom}", None, &v, today()), "{user:password} {custom}");
        assert_eq!(resolve_merge_tags("a {user:ID", None, &v, today()), "a {user:ID");
        assert_eq!(resolve_merge_tags("{{user:ID}", None, &v, today()), "{42");
        assert_eq!(resolve_merge_tags("{form_id}", None, &v, today()), "{form_id}");
    }
}
