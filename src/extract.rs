//! As-run event extraction from BXF/PMCP-style XML.
//!
//! The extractor walks one document with a quick-xml pull parser and emits
//! [`PlayoutEvent`]s in document order, one per `CompleteAsRun` element.
//! Field lookup is path-based on element *local* names (namespace prefixes
//! are stripped); no schema validation is performed.
//!
//! Failure isolation has two levels:
//!
//! - **Record-local**: anything that goes wrong while assembling one record
//!   (an unresolvable timecode, a timing element without its timecode child,
//!   a broken attribute) drops only that record, with a warning. The rest of
//!   the document is still extracted.
//! - **Document-level**: structurally invalid XML fails the whole call with
//!   [`XmlParseError`]. There is no partial result.
//!
//! Unknown vocabulary values never abort anything; they classify to the
//! `Unknown` member and the unique raw values seen are logged at the end of
//! the walk for operational monitoring.

use std::collections::BTreeSet;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::PlayoutEvent;
use crate::timecode::{resolve_timecode, TimecodeParseError};
use crate::vocab::{EndMode, EventCategory, SpotType, StartMode};

/// Structurally invalid document. Document-fatal; no events are returned.
#[derive(Debug, Error)]
#[error("malformed XML at byte {position}: {source}")]
pub struct XmlParseError {
    pub position: u64,
    #[source]
    pub source: quick_xml::Error,
}

/// Why one record was dropped. Never escapes this module except as a warning.
#[derive(Debug, Error)]
enum RecordError {
    #[error(transparent)]
    Timecode(#[from] TimecodeParseError),
    #[error("StartDateTime present without an SmpteTimeCode child")]
    MissingTimecode,
    #[error("unreadable content: {0}")]
    Content(String),
}

/// Extract all playout events from one as-run document.
///
/// Returns the events in document order. A fresh parse is required per
/// invocation; the returned vector is the complete, finite result.
pub fn extract_events(xml: &str) -> Result<Vec<PlayoutEvent>, XmlParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut events: Vec<PlayoutEvent> = Vec::new();
    let mut current: Option<RecordBuilder> = None;
    let mut rec_base = 0usize;
    let mut records_seen = 0usize;
    let mut records_dropped = 0usize;
    let mut summary = VocabSummary::default();

    loop {
        match reader.read_event() {
            Err(source) => {
                return Err(XmlParseError {
                    position: reader.buffer_position() as u64,
                    source,
                })
            }
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = local_name(e.local_name().as_ref());
                if let Some(rec) = current.as_mut() {
                    rec.observe_element(&name, &stack, &e);
                }
                stack.push(name);
                if stack.last().map(String::as_str) == Some("CompleteAsRun") && current.is_none() {
                    rec_base = stack.len();
                    records_seen += 1;
                    current = Some(RecordBuilder::default());
                }
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(e.local_name().as_ref());
                if let Some(rec) = current.as_mut() {
                    rec.observe_element(&name, &stack, &e);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(rec) = current.as_mut() {
                    match t.unescape() {
                        Ok(text) => rec.assign(&stack[rec_base..], text.trim()),
                        Err(e) => rec.fail(RecordError::Content(e.to_string())),
                    }
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(rec) = current.as_mut() {
                    let text = String::from_utf8_lossy(&t.into_inner()).to_string();
                    rec.assign(&stack[rec_base..], text.trim());
                }
            }
            Ok(Event::End(e)) => {
                let name = local_name(e.local_name().as_ref());
                if name == "CompleteAsRun" && stack.len() == rec_base {
                    if let Some(rec) = current.take() {
                        match rec.finish(&mut summary) {
                            Ok(event) => {
                                debug!(event_id = ?event.event_id, "extracted as-run event");
                                events.push(event);
                            }
                            Err(err) => {
                                records_dropped += 1;
                                warn!(record = records_seen, error = %err, "dropping as-run record");
                            }
                        }
                    }
                }
                stack.pop();
            }
            Ok(_) => {}
        }
    }

    info!(
        records = records_seen,
        extracted = events.len(),
        dropped = records_dropped,
        "as-run document walk complete"
    );
    summary.log();

    Ok(events)
}

fn local_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_string()
}

fn path_ends_with(path: &[String], suffix: &[&str]) -> bool {
    path.len() >= suffix.len()
        && path[path.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(a, b)| a == b)
}

/// Unique raw vocabulary values observed in one document.
#[derive(Default)]
struct VocabSummary {
    spot_types: BTreeSet<String>,
    start_modes: BTreeSet<String>,
    end_modes: BTreeSet<String>,
}

impl VocabSummary {
    fn log(&self) {
        if !self.spot_types.is_empty() {
            info!(spot_types = ?self.spot_types, "unique spot types in document");
        }
        if !self.start_modes.is_empty() {
            info!(start_modes = ?self.start_modes, "unique start modes in document");
        }
        if !self.end_modes.is_empty() {
            info!(end_modes = ?self.end_modes, "unique end modes in document");
        }
    }
}

/// Accumulates one `CompleteAsRun` record during the walk.
///
/// All assignments are first-occurrence-wins, mirroring path lookup on a
/// materialized tree. A failed record keeps consuming input (the walk must
/// stay aligned with the element stack) but is discarded at its end tag.
#[derive(Default)]
struct RecordBuilder {
    failed: Option<RecordError>,
    saw_program: bool,
    saw_non_program: bool,
    saw_start_datetime: bool,
    broadcast_date: Option<String>,
    start_timecode: Option<String>,
    event_id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    duration: Option<String>,
    spot_type: Option<String>,
    start_mode: Option<String>,
    end_mode: Option<String>,
    status: Option<String>,
    event_type: Option<String>,
    house_number: Option<String>,
    source: Option<String>,
    segment_number: Option<String>,
    segment_name: Option<String>,
    program_name: Option<String>,
    non_program_name: Option<String>,
}

impl RecordBuilder {
    fn fail(&mut self, err: RecordError) {
        if self.failed.is_none() {
            self.failed = Some(err);
        }
    }

    /// React to an opening (or self-closing) element inside the record.
    ///
    /// `stack` holds the path *up to the parent* of `name`.
    fn observe_element(
        &mut self,
        name: &str,
        stack: &[String],
        e: &quick_xml::events::BytesStart<'_>,
    ) {
        match name {
            "ProgramEvent" => self.saw_program = true,
            "NonProgramEvent" => self.saw_non_program = true,
            "SmpteDateTime" if stack.last().map(String::as_str) == Some("StartDateTime") => {
                self.saw_start_datetime = true;
                for attr in e.attributes() {
                    let attr = match attr {
                        Ok(a) => a,
                        Err(err) => {
                            self.fail(RecordError::Content(err.to_string()));
                            return;
                        }
                    };
                    if attr.key.local_name().as_ref() == b"broadcastDate" {
                        match attr.unescape_value() {
                            Ok(v) => self.broadcast_date = Some(v.trim().to_string()),
                            Err(err) => self.fail(RecordError::Content(err.to_string())),
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Route a text node to a field based on its path inside the record.
    fn assign(&mut self, rel_path: &[String], text: &str) {
        if text.is_empty() || self.failed.is_some() {
            return;
        }
        let set = |slot: &mut Option<String>| {
            if slot.is_none() {
                *slot = Some(text.to_string());
            }
        };

        if path_ends_with(rel_path, &["EventId", "EventId"]) {
            set(&mut self.event_id);
        } else if path_ends_with(rel_path, &["EventTitle"]) {
            set(&mut self.title);
        } else if path_ends_with(rel_path, &["Description"]) {
            set(&mut self.description);
        } else if path_ends_with(rel_path, &["NonProgramEvent", "Details", "SpotType"]) {
            set(&mut self.spot_type);
        } else if path_ends_with(rel_path, &["ProgramEvent", "SegmentNumber"]) {
            set(&mut self.segment_number);
        } else if path_ends_with(rel_path, &["ProgramEvent", "SegmentName"]) {
            set(&mut self.segment_name);
        } else if path_ends_with(rel_path, &["ProgramEvent", "ProgramName"]) {
            set(&mut self.program_name);
        } else if path_ends_with(rel_path, &["NonProgramEvent", "NonPrimaryEventName"]) {
            set(&mut self.non_program_name);
        } else if path_ends_with(rel_path, &["StartMode"]) {
            set(&mut self.start_mode);
        } else if path_ends_with(rel_path, &["EndMode"]) {
            set(&mut self.end_mode);
        } else if path_ends_with(rel_path, &["RouterSource", "Name"]) {
            set(&mut self.source);
        } else if path_ends_with(rel_path, &["AsRunDetail", "Status"]) {
            set(&mut self.status);
        } else if path_ends_with(rel_path, &["AsRunDetail", "Type"]) {
            set(&mut self.event_type);
        } else if path_ends_with(rel_path, &["StartDateTime", "SmpteDateTime", "SmpteTimeCode"]) {
            set(&mut self.start_timecode);
        } else if path_ends_with(rel_path, &["SmpteDuration", "SmpteTimeCode"]) {
            set(&mut self.duration);
        } else if path_ends_with(rel_path, &["ContentId", "HouseNumber"]) {
            set(&mut self.house_number);
        }
    }

    fn finish(self, summary: &mut VocabSummary) -> Result<PlayoutEvent, RecordError> {
        if let Some(err) = self.failed {
            return Err(err);
        }

        // Timing: absence of the subtree is a null start time, but a
        // StartDateTime element whose timecode child is missing or
        // unresolvable fails the record.
        let start_time = if self.saw_start_datetime {
            let date = self.broadcast_date.as_deref().unwrap_or_default();
            let code = self
                .start_timecode
                .as_deref()
                .ok_or(RecordError::MissingTimecode)?;
            Some(resolve_timecode(date, code)?)
        } else {
            None
        };

        let category = if self.saw_non_program {
            Some(EventCategory::NonProgram)
        } else if self.saw_program {
            Some(EventCategory::Program)
        } else {
            None
        };

        let spot_type_category = self.spot_type.as_deref().map(|raw| {
            summary.spot_types.insert(raw.to_string());
            SpotType::classify(raw)
        });
        let start_mode_category = self.start_mode.as_deref().map(|raw| {
            summary.start_modes.insert(raw.to_string());
            StartMode::classify(raw)
        });
        let end_mode_category = self.end_mode.as_deref().map(|raw| {
            summary.end_modes.insert(raw.to_string());
            EndMode::classify(raw)
        });

        Ok(PlayoutEvent {
            event_id: self.event_id,
            title: self.title,
            category,
            description: self.description,
            start_time,
            duration: self.duration,
            spot_type: self.spot_type,
            spot_type_category,
            start_mode: self.start_mode,
            start_mode_category,
            end_mode: self.end_mode,
            end_mode_category,
            status: self.status,
            event_type: self.event_type,
            house_number: self.house_number,
            source: self.source,
            segment_number: self.segment_number,
            segment_name: self.segment_name,
            program_name: self.program_name,
            non_program_name: self.non_program_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn wrap(records: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<bxf:BxfMessage xmlns:bxf="http://smpte-ra.org/schemas/2021/2012/BXF">
  <bxf:AsRun>
{records}
  </bxf:AsRun>
</bxf:BxfMessage>"#
        )
    }

    fn non_program_record(event_id: &str, timecode: &str) -> String {
        format!(
            r#"    <bxf:CompleteAsRun>
      <bxf:EventData>
        <bxf:EventId><bxf:EventId>{event_id}</bxf:EventId></bxf:EventId>
        <bxf:EventTitle>Morning Spot</bxf:EventTitle>
        <bxf:StartMode>Fixed</bxf:StartMode>
        <bxf:EndMode>Duration</bxf:EndMode>
        <bxf:PrimaryEvent>
          <bxf:NonProgramEvent>
            <bxf:NonPrimaryEventName>Underwriting</bxf:NonPrimaryEventName>
            <bxf:Details><bxf:SpotType>PSA</bxf:SpotType></bxf:Details>
          </bxf:NonProgramEvent>
        </bxf:PrimaryEvent>
        <bxf:Description>Local announcement</bxf:Description>
        <bxf:RouterSource><bxf:Name>SRV-1</bxf:Name></bxf:RouterSource>
        <bxf:ContentId><bxf:HouseNumber>HN-0042</bxf:HouseNumber></bxf:ContentId>
      </bxf:EventData>
      <bxf:AsRunDetail>
        <bxf:Status>Aired</bxf:Status>
        <bxf:Type>Primary</bxf:Type>
        <bxf:StartDateTime>
          <bxf:SmpteDateTime broadcastDate="2024-11-10">
            <bxf:SmpteTimeCode>{timecode}</bxf:SmpteTimeCode>
          </bxf:SmpteDateTime>
        </bxf:StartDateTime>
        <bxf:Duration>
          <bxf:SmpteDuration><bxf:SmpteTimeCode>00:00:30;00</bxf:SmpteTimeCode></bxf:SmpteDuration>
        </bxf:Duration>
      </bxf:AsRunDetail>
    </bxf:CompleteAsRun>
"#
        )
    }

    #[test]
    fn extracts_fields_from_a_namespaced_record() {
        let xml = wrap(&non_program_record("EVT-1", "05:59:59;29"));
        let events = extract_events(&xml).unwrap();
        assert_eq!(events.len(), 1);

        let e = &events[0];
        assert_eq!(e.event_id.as_deref(), Some("EVT-1"));
        assert_eq!(e.title.as_deref(), Some("Morning Spot"));
        assert_eq!(e.category, Some(EventCategory::NonProgram));
        assert_eq!(e.description.as_deref(), Some("Local announcement"));
        assert_eq!(e.spot_type.as_deref(), Some("PSA"));
        assert_eq!(e.spot_type_category, Some(SpotType::Psa));
        assert_eq!(e.start_mode_category, Some(StartMode::Fixed));
        assert_eq!(e.end_mode_category, Some(EndMode::Duration));
        assert_eq!(e.status.as_deref(), Some("Aired"));
        assert_eq!(e.event_type.as_deref(), Some("Primary"));
        assert_eq!(e.source.as_deref(), Some("SRV-1"));
        assert_eq!(e.house_number.as_deref(), Some("HN-0042"));
        assert_eq!(e.duration.as_deref(), Some("00:00:30;00"));
        assert_eq!(e.non_program_name.as_deref(), Some("Underwriting"));
        assert_eq!(
            e.start_time,
            Some(
                NaiveDate::from_ymd_opt(2024, 11, 10)
                    .unwrap()
                    .and_hms_opt(5, 59, 59)
                    .unwrap()
            )
        );
    }

    #[test]
    fn program_record_carries_segment_fields() {
        let record = r#"    <bxf:CompleteAsRun>
      <bxf:EventData>
        <bxf:EventId><bxf:EventId>EVT-P</bxf:EventId></bxf:EventId>
        <bxf:PrimaryEvent>
          <bxf:ProgramEvent>
            <bxf:SegmentNumber>2</bxf:SegmentNumber>
            <bxf:SegmentName>Act Two</bxf:SegmentName>
            <bxf:ProgramName>Evening News</bxf:ProgramName>
          </bxf:ProgramEvent>
        </bxf:PrimaryEvent>
      </bxf:EventData>
    </bxf:CompleteAsRun>
"#;
        let events = extract_events(&wrap(record)).unwrap();
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.category, Some(EventCategory::Program));
        assert_eq!(e.segment_number.as_deref(), Some("2"));
        assert_eq!(e.segment_name.as_deref(), Some("Act Two"));
        assert_eq!(e.program_name.as_deref(), Some("Evening News"));
        // No timing subtree: start time is null, the record is kept.
        assert_eq!(e.start_time, None);
    }

    #[test]
    fn bad_timecode_drops_only_that_record() {
        let mut records = String::new();
        records.push_str(&non_program_record("EVT-1", "05:00:00;00"));
        records.push_str(&non_program_record("EVT-BAD", "not-a-timecode"));
        records.push_str(&non_program_record("EVT-3", "07:00:00;00"));

        let events = extract_events(&wrap(&records)).unwrap();
        let ids: Vec<_> = events.iter().filter_map(|e| e.event_id.clone()).collect();
        assert_eq!(ids, vec!["EVT-1", "EVT-3"]);
    }

    #[test]
    fn missing_timing_subtree_is_not_an_error() {
        // Per-record isolation drops records only for thrown errors, never
        // for optional-field absence.
        let record = r#"    <bxf:CompleteAsRun>
      <bxf:EventData>
        <bxf:EventId><bxf:EventId>EVT-NT</bxf:EventId></bxf:EventId>
        <bxf:EventTitle>Untimed</bxf:EventTitle>
      </bxf:EventData>
    </bxf:CompleteAsRun>
"#;
        let mut records = String::new();
        records.push_str(&non_program_record("EVT-1", "05:00:00;00"));
        records.push_str(record);
        records.push_str(&non_program_record("EVT-2", "06:00:00;00"));
        records.push_str(&non_program_record("EVT-3", "07:00:00;00"));

        let events = extract_events(&wrap(&records)).unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[1].event_id.as_deref(), Some("EVT-NT"));
        assert_eq!(events[1].start_time, None);
    }

    #[test]
    fn unknown_spot_type_degrades_instead_of_dropping() {
        let record = non_program_record("EVT-U", "05:00:00;00").replace("PSA", "ZZ");
        let events = extract_events(&wrap(&record)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].spot_type.as_deref(), Some("ZZ"));
        assert_eq!(events[0].spot_type_category, Some(SpotType::Unknown));
    }

    #[test]
    fn structurally_invalid_document_is_fatal() {
        let err = extract_events("<bxf:AsRun><bxf:CompleteAsRun></bxf:AsRun>").unwrap_err();
        assert!(err.to_string().contains("malformed XML"));
    }

    #[test]
    fn document_without_records_yields_empty() {
        let events = extract_events(&wrap("")).unwrap();
        assert!(events.is_empty());
    }
}
