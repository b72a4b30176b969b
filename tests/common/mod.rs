//! Shared fixtures for the end-to-end tests.

use std::path::Path;

use asrun_analyzer::config::{Config, DbConfig, RemoteConfig, ServerConfig};

pub fn test_config(root: &Path) -> Config {
    Config {
        db: DbConfig {
            path: root.join("data/asrun.sqlite"),
        },
        remote: RemoteConfig {
            root: root.join("remote"),
            spool: root.join("spool"),
            ..RemoteConfig::default()
        },
        continuity: Default::default(),
        scheduler: Default::default(),
        server: ServerConfig {
            bind: "127.0.0.1:7410".to_string(),
        },
    }
}

/// A minimal BXF document wrapping the given `CompleteAsRun` records.
pub fn bxf_document(records: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<bxf:BxfMessage xmlns:bxf="http://smpte-ra.org/schemas/2021/2012/BXF">
  <bxf:AsRun>
{records}
  </bxf:AsRun>
</bxf:BxfMessage>"#
    )
}

/// One well-formed non-program as-run record.
pub fn bxf_record(event_id: &str, date: &str, timecode: &str) -> String {
    format!(
        r#"    <bxf:CompleteAsRun>
      <bxf:EventData>
        <bxf:EventId><bxf:EventId>{event_id}</bxf:EventId></bxf:EventId>
        <bxf:EventTitle>Spot {event_id}</bxf:EventTitle>
        <bxf:StartMode>Fixed</bxf:StartMode>
        <bxf:EndMode>Duration</bxf:EndMode>
        <bxf:PrimaryEvent>
          <bxf:NonProgramEvent>
            <bxf:Details><bxf:SpotType>PSA</bxf:SpotType></bxf:Details>
          </bxf:NonProgramEvent>
        </bxf:PrimaryEvent>
      </bxf:EventData>
      <bxf:AsRunDetail>
        <bxf:Status>Aired</bxf:Status>
        <bxf:StartDateTime>
          <bxf:SmpteDateTime broadcastDate="{date}">
            <bxf:SmpteTimeCode>{timecode}</bxf:SmpteTimeCode>
          </bxf:SmpteDateTime>
        </bxf:StartDateTime>
      </bxf:AsRunDetail>
    </bxf:CompleteAsRun>
"#
    )
}

/// A document holding one record per (event_id, timecode) pair, all on the
/// same broadcast date.
pub fn bxf_document_with_events(date: &str, events: &[(&str, &str)]) -> String {
    let records: String = events
        .iter()
        .map(|(id, tc)| bxf_record(id, date, tc))
        .collect();
    bxf_document(&records)
}
