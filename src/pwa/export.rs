//! CSV and RSS renderings of PWA lists.

use crate::db::DbPwa;
use crate::error::DirectoryError;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::Serialize;
use std::io;

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

#[derive(Serialize)]
struct CsvRow<'a> {
    id: i64,
    name: &'a str,
    short_name: &'a str,
    start_url: &'a str,
    manifest_url: &'a str,
    icon_url: &'a str,
    lighthouse_score: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl<'a> From<&'a DbPwa> for CsvRow<'a> {
    fn from(p: &'a DbPwa) -> Self {
        Self {
            id: p.id,
            name: p.name.as_deref().unwrap_or_default(),
            short_name: p.short_name.as_deref().unwrap_or_default(),
            start_url: &p.start_url,
            manifest_url: &p.manifest_url,
            icon_url: p.icon_url.as_deref().unwrap_or_default(),
            lighthouse_score: p.lighthouse_score,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

/// One header line, then one record per PWA in the given order.
pub fn to_csv(pwas: &[DbPwa]) -> Result<Vec<u8>, DirectoryError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    if pwas.is_empty() {
        // `serialize` only emits headers together with the first record.
        wtr.write_record([
            "id",
            "name",
            "short_name",
            "start_url",
            "manifest_url",
            "icon_url",
            "lighthouse_score",
            "created_at",
            "updated_at",
        ])?;
    }
    for pwa in pwas {
        wtr.serialize(CsvRow::from(pwa))?;
    }
    wtr.into_inner()
        .map_err(|e| DirectoryError::UnexpectedError(format!("CSV flush failed: {e}")))
}

/// Channel-level metadata of the feed.
pub struct FeedChannel<'a> {
    pub title: &'a str,
    /// Public base URL without trailing slash.
    pub link: &'a str,
    pub description: &'a str,
}

/// RSS 2.0 document, one `<item>` per PWA in the given order.
pub fn to_rss(channel: &FeedChannel<'_>, pwas: &[DbPwa]) -> Result<Vec<u8>, DirectoryError> {
    write_rss(channel, pwas)
        .map_err(|e| DirectoryError::UnexpectedError(format!("RSS write failed: {e}")))
}

fn write_rss(channel: &FeedChannel<'_>, pwas: &[DbPwa]) -> io::Result<Vec<u8>> {
    let mut w = Writer::new(Vec::with_capacity(512 + pwas.len() * 384));
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    w.write_event(Event::Start(
        BytesStart::new("rss").with_attributes([("version", "2.0")]),
    ))?;
    w.write_event(Event::Start(BytesStart::new("channel")))?;
    text_element(&mut w, "title", channel.title)?;
    text_element(&mut w, "link", channel.link)?;
    text_element(&mut w, "description", channel.description)?;
    if let Some(latest) = pwas.iter().map(|p| p.created_at).max() {
        text_element(&mut w, "lastBuildDate", &latest.to_rfc2822())?;
    }

    for pwa in pwas {
        let link = format!("{}/pwas/{}", channel.link, pwa.id);
        w.write_event(Event::Start(BytesStart::new("item")))?;
        text_element(&mut w, "title", pwa.display_name())?;
        text_element(&mut w, "link", &link)?;
        w.write_event(Event::Start(
            BytesStart::new("guid").with_attributes([("isPermaLink", "true")]),
        ))?;
        w.write_event(Event::Text(BytesText::new(&link)))?;
        w.write_event(Event::End(BytesEnd::new("guid")))?;
        if let Some(desc) = pwa.description.as_deref() {
            text_element(&mut w, "description", desc)?;
        }
        text_element(&mut w, "pubDate", &pwa.created_at.to_rfc2822())?;
        w.write_event(Event::End(BytesEnd::new("item")))?;
    }

    w.write_event(Event::End(BytesEnd::new("channel")))?;
    w.write_event(Event::End(BytesEnd::new("rss")))?;
    Ok(w.into_inner())
}

fn text_element(w: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> io::Result<()> {
    // Control characters other than whitespace are not allowed in XML 1.0.
    let text: String = text
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect();
    w.write_event(Event::Start(BytesStart::new(tag)))?;
    w.write_event(Event::Text(BytesText::new(&text)))?;
    w.write_event(Event::End(BytesEnd::new(tag)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pwa(id: i64, name: Option<&str>, desc: Option<&str>) -> DbPwa {
        let ts = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        DbPwa {
            id,
            manifest_url: format!("https://app{id}.example/manifest.json"),
            start_url: format!("https://app{id}.example/"),
            name: name.map(str::to_string),
            short_name: None,
            description: desc.map(str::to_string),
            background_color: None,
            theme_color: None,
            icon_url: None,
            manifest_json: "{}".to_string(),
            lighthouse_score: Some(88),
            user_id: "u".to_string(),
            user_email: None,
            visible: true,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn csv_has_header_and_quotes_commas() {
        let bytes = to_csv(&[pwa(7, Some("Notes, but fast"), None)]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,name,short_name,start_url,manifest_url,icon_url,lighthouse_score,created_at,updated_at"
        );
        assert_eq!(
            lines.next().unwrap(),
            "7,\"Notes, but fast\",,https://app7.example/,https://app7.example/manifest.json,,88,\
             2024-03-15T12:00:00+00:00,2024-03-15T12:00:00+00:00"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn empty_csv_still_has_a_header() {
        let text = String::from_utf8(to_csv(&[]).unwrap()).unwrap();
        assert!(text.starts_with("id,name,"));
        assert_eq!(text.lines().count(), 1);
    }

    fn rss_text(channel: &FeedChannel<'_>, pwas: &[DbPwa]) -> String {
        String::from_utf8(to_rss(channel, pwas).unwrap()).unwrap()
    }

    #[test]
    fn rss_items_link_to_detail_pages_and_escape_text() {
        let channel = FeedChannel {
            title: "PWA Directory",
            link: "https://pwa.example",
            description: "Newest apps",
        };
        let item = pwa(3, Some("Tom & Jerry <3>"), Some("Cats \"and\" mice\u{7}"));
        let xml = rss_text(&channel, &[item]);

        assert!(xml.starts_with(
            r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel>"#
        ));
        assert!(xml.contains("<title>Tom &amp; Jerry &lt;3&gt;</title>"));
        assert!(xml.contains("<link>https://pwa.example/pwas/3</link>"));
        assert!(xml.contains("<guid isPermaLink=\"true\">https://pwa.example/pwas/3</guid>"));
        assert!(xml.contains("<description>Cats &quot;and&quot; mice</description>"));
        assert!(xml.contains("<pubDate>Fri, 15 Mar 2024 12:00:00 +0000</pubDate>"));
    }

    #[test]
    fn rss_falls_back_to_manifest_url_for_nameless_apps() {
        let channel = FeedChannel {
            title: "t",
            link: "https://pwa.example",
            description: "d",
        };
        let xml = rss_text(&channel, &[pwa(1, None, None)]);
        assert!(xml.contains("<item><title>https://app1.example/manifest.json</title>"));
        assert!(xml.ends_with("</item></channel></rss>"));
    }
}
