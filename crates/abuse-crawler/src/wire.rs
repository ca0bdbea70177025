//! GraphQL wire format of the upstream `GetReports` operation.
//!
//! Only the fields the crawler persists are requested and decoded. Missing
//! node fields fall back to empty strings, zero counts and `false`, matching
//! what upstream omits for deleted or anonymous reporters.

use abuse_core::{
  config::OrderBy,
  report::{NewUnifiedAddress, Report, ReportAddress, ReportRecord},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::FetchError;

pub const OPERATION_NAME: &str = "GetReports";

pub const QUERY: &str = r#"
query GetReports($input: ReportsInput, $after: String, $before: String, $last: Float, $first: Float) {
  reports(input: $input, after: $after, before: $before, last: $last, first: $first) {
    pageInfo {
      hasNextPage
      endCursor
    }
    edges {
      node {
        id
        isPrivate
        createdAt
        scamCategory
        categoryDescription
        biDirectionalVoteCount
        viewerDidVote
        description
        commentsCount
        source
        checked
        reportedBy {
          id
          username
          trusted
        }
        addresses {
          id
          address
          chain
        }
      }
    }
  }
}
"#;

// ─── Request ─────────────────────────────────────────────────────────────────

/// Build the JSON body for one page request.
pub fn request_body(
  partition: &str,
  order_by: &OrderBy,
  page_size: u32,
  after: Option<&str>,
) -> Value {
  let mut variables = json!({
    "input": {
      "chains": [partition],
      "scamCategories": [],
      "orderBy": order_by,
    },
    "first": page_size,
  });
  if let Some(cursor) = after {
    variables["after"] = json!(cursor);
  }
  json!({
    "operationName": OPERATION_NAME,
    "variables": variables,
    "query": QUERY,
  })
}

// ─── Response envelope ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope {
  data:   Option<Data>,
  errors: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Data {
  reports: Option<Connection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection {
  page_info: Option<PageInfo>,
  edges:     Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
  #[serde(default)]
  has_next_page: bool,
  end_cursor:    Option<String>,
}

/// One decoded page of results.
///
/// Edges are kept as raw JSON so that one malformed node fails only its own
/// record.
#[derive(Debug, Clone, Default)]
pub struct Page {
  pub edges:       Vec<Value>,
  pub next_cursor: Option<String>,
  pub has_more:    bool,
}

/// Decode a 2xx response body into a [`Page`].
pub fn parse_page(body: &str) -> Result<Page, FetchError> {
  let envelope: Envelope = serde_json::from_str(body)
    .map_err(|e| FetchError::Protocol(format!("response is not valid JSON: {e}")))?;

  if let Some(errors) = envelope.errors {
    return Err(FetchError::Protocol(format!("graphql errors: {errors}")));
  }
  let connection = envelope
    .data
    .ok_or_else(|| FetchError::Protocol("response has no data".into()))?
    .reports
    .ok_or_else(|| FetchError::Protocol("response has no reports".into()))?;
  let edges = connection
    .edges
    .ok_or_else(|| FetchError::Protocol("response has no edges".into()))?;
  let page_info = connection.page_info.unwrap_or_default();

  Ok(Page {
    edges,
    has_more: page_info.has_next_page,
    next_cursor: page_info.end_cursor,
  })
}

// ─── Report nodes ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Edge {
  pub node: ReportNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportNode {
  pub id:                        String,
  pub is_private:                Option<bool>,
  pub created_at:                Option<String>,
  pub scam_category:             Option<String>,
  pub category_description:      Option<String>,
  pub bi_directional_vote_count: Option<i64>,
  pub viewer_did_vote:           Option<bool>,
  pub description:               Option<String>,
  pub comments_count:            Option<i64>,
  pub source:                    Option<String>,
  pub checked:                   Option<bool>,
  pub reported_by:               Option<Reporter>,
  #[serde(default)]
  pub addresses:                 Option<Vec<Option<AddressNode>>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Reporter {
  pub id:       Option<String>,
  pub username: Option<String>,
  pub trusted:  Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AddressNode {
  pub id:      String,
  pub address: Option<String>,
  pub chain:   Option<String>,
}

impl ReportNode {
  /// Whether the reporting user is marked trusted upstream.
  pub fn is_trusted(&self) -> bool {
    self.reported_by.as_ref().and_then(|r| r.trusted).unwrap_or(false)
  }

  /// Map this node onto the rows written for it.
  ///
  /// Addresses with an empty address string are dropped; registry entries
  /// are produced only when both address and chain are present.
  pub fn into_record(self, partition: &str, provenance: &str) -> ReportRecord {
    let reporter = self.reported_by.unwrap_or_default();
    let reporter_username = reporter.username.unwrap_or_default();
    let scam_category = self.scam_category.unwrap_or_default();

    let mut addresses = Vec::new();
    let mut unified = Vec::new();
    for node in self.addresses.unwrap_or_default().into_iter().flatten() {
      let address = node.address.unwrap_or_default();
      if address.is_empty() {
        continue;
      }
      let chain = node.chain.unwrap_or_default();
      if !chain.is_empty() {
        unified.push(NewUnifiedAddress::scam(
          address.clone(),
          scam_category.clone(),
          provenance,
          &reporter_username,
        ));
      }
      addresses.push(ReportAddress {
        id: node.id,
        report_id: self.id.clone(),
        address,
        chain,
      });
    }

    let report = Report {
      id:                   self.id,
      is_private:           self.is_private.unwrap_or(false),
      created_at:           self.created_at.unwrap_or_default(),
      scam_category,
      category_description: self.category_description.unwrap_or_default(),
      vote_count:           self.bi_directional_vote_count.unwrap_or(0),
      viewer_did_vote:      self.viewer_did_vote,
      description:          self.description.unwrap_or_default(),
      comments_count:       self.comments_count.unwrap_or(0),
      source:               self.source.unwrap_or_default(),
      checked:              self.checked,
      reporter_id:          reporter.id.unwrap_or_default(),
      reporter_username,
      reporter_trusted:     reporter.trusted.unwrap_or(false),
      partition:            partition.to_owned(),
    };

    ReportRecord { report, addresses, unified }
  }
}
