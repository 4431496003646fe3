use async_trait::async_trait;
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;

use super::skills::extract_skills;
use super::{send_for_text, FetchQuery, JobProvider, ProviderError, ProviderKind, RawPosting};
use crate::models::job::{JobDraft, JobSource};

const INDEED_RSS_URL: &str = "https://www.indeed.com/rss";

#[derive(Debug, Deserialize)]
struct RssFeed {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RssItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
}

/// Indeed's public RSS search feed. No credentials.
pub struct IndeedRssProvider {
    client: Client,
    feed_url: String,
}

impl IndeedRssProvider {
    pub fn new(client: Client) -> Self {
        Self::with_feed_url(client, INDEED_RSS_URL)
    }

    pub fn with_feed_url(client: Client, feed_url: &str) -> Self {
        Self {
            client,
            feed_url: feed_url.to_string(),
        }
    }
}

pub fn parse_feed(xml: &str) -> Result<Vec<RssItem>, ProviderError> {
    let feed: RssFeed = from_str(xml)
        .map_err(|e| ProviderError::malformed(ProviderKind::IndeedRss, format!("invalid rss: {e}")))?;
    Ok(feed.channel.items)
}

#[async_trait]
impl JobProvider for IndeedRssProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::IndeedRss
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<JobDraft>, ProviderError> {
        let limit = query.limit.to_string();
        let request = self.client.get(&self.feed_url).query(&[
            ("q", query.query.as_str()),
            ("l", query.location().unwrap_or("")),
            ("limit", limit.as_str()),
        ]);
        let xml = send_for_text(self.kind(), request).await?;

        let requested_location = query.location().map(String::from);
        Ok(parse_feed(&xml)?
            .into_iter()
            .filter(|item| !item.title.trim().is_empty() && !item.link.trim().is_empty())
            .take(query.limit)
            .map(|item| {
                RawPosting::IndeedRss {
                    item,
                    requested_location: requested_location.clone(),
                }
                .normalize()
            })
            .collect())
    }
}

/// Indeed titles read `Title - Company - Location`.
pub(crate) fn to_draft(item: RssItem, requested_location: Option<&str>) -> JobDraft {
    let mut parts = item.title.split(" - ").map(str::trim);
    let title = parts
        .next()
        .filter(|t| !t.is_empty())
        .unwrap_or(item.title.as_str())
        .to_string();
    let company = parts
        .next()
        .filter(|c| !c.is_empty())
        .unwrap_or("Unknown")
        .to_string();
    let location = parts
        .next()
        .filter(|l| !l.is_empty())
        .or(requested_location)
        .unwrap_or_default()
        .to_string();
    let skills = extract_skills(&item.description);

    JobDraft {
        title,
        company,
        location,
        description: item.description,
        source: JobSource::Indeed,
        source_url: Some(item.link),
        skills,
        ..JobDraft::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Indeed.com - rust jobs</title>
    <link>https://www.indeed.com/</link>
    <description>rust jobs</description>
    <item>
      <title><![CDATA[Rust Developer - Ferrous Ltd - Austin, TX]]></title>
      <link>https://www.indeed.com/viewjob?jk=1</link>
      <description><![CDATA[Write Rust & SQL services]]></description>
    </item>
    <item>
      <title><![CDATA[Embedded Engineer]]></title>
      <link>https://www.indeed.com/viewjob?jk=2</link>
      <description><![CDATA[Firmware]]></description>
    </item>
    <item>
      <title><![CDATA[No Link Role - Corp]]></title>
      <link></link>
      <description></description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed_reads_cdata_items() {
        let items = parse_feed(FEED).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].title, "Rust Developer - Ferrous Ltd - Austin, TX");
        assert_eq!(items[0].description, "Write Rust & SQL services");
    }

    #[test]
    fn test_parse_feed_rejects_garbage() {
        assert!(matches!(
            parse_feed("<rss><nochannel/></rss>"),
            Err(ProviderError::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_splits_titles_and_drops_linkless_items() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/rss")
            .match_query(Matcher::UrlEncoded("q".into(), "rust".into()))
            .with_status(200)
            .with_header("content-type", "application/rss+xml")
            .with_body(FEED)
            .create_async()
            .await;

        let provider =
            IndeedRssProvider::with_feed_url(Client::new(), &format!("{}/rss", server.url()));
        let mut query = FetchQuery::new("rust", 10);
        query.location = Some("Remote".to_string());
        let drafts = provider.fetch(&query).await.unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].title, "Rust Developer");
        assert_eq!(drafts[0].company, "Ferrous Ltd");
        assert_eq!(drafts[0].location, "Austin, TX");
        assert_eq!(drafts[0].source, JobSource::Indeed);
        assert_eq!(drafts[0].skills, vec!["Rust", "SQL"]);
        assert_eq!(drafts[1].company, "Unknown");
        assert_eq!(drafts[1].location, "Remote");
    }
}
