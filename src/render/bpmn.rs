//! BPMN 2.0 XML export for parsed process maps.
//!
//! ## Id policy
//! Flow-node ids are the notation's `as` identifiers, NCName-sanitized.
//! Sequence/message flow ids are numbered in connection declaration order.
//! Output is deterministic: the same [`ProcessMap`] always serializes to the
//! byte-identical document.
//!
//! ## Pools
//! A pool-less diagram (one implicit anonymous pool) exports as a single
//! `<bpmn:process>`. Named or multiple pools export as a collaboration with
//! one participant+process per pool; connections that cross pools become
//! message flows on the collaboration.

use crate::piperflow::{ElementKind, ProcessMap};
use anyhow::Result;
use std::fmt::Write;

/// Export a [`ProcessMap`] to BPMN 2.0 XML.
pub fn to_bpmn_xml(map: &ProcessMap) -> Result<String> {
    let mut xml = String::new();

    writeln!(xml, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        xml,
        r#"<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL""#
    )?;
    writeln!(
        xml,
        r#"                  id="Definitions_1" targetNamespace="http://bpmn.io/schema/bpmn">"#
    )?;

    let collaboration = map.pools.len() > 1 || map.pools.iter().any(|p| p.name.is_some());
    let process_ids: Vec<String> = map
        .pools
        .iter()
        .enumerate()
        .map(|(i, p)| match &p.name {
            Some(name) => format!("Process_{}", sanitize_ncname(name)),
            None => format!("Process_{}", i + 1),
        })
        .collect();

    // Split connections into same-pool sequence flows and cross-pool message
    // flows, keyed by the source's pool.
    let pool_of = |id: &str| -> Option<usize> {
        map.pools.iter().enumerate().find_map(|(i, p)| {
            p.lanes
                .iter()
                .any(|l| l.elements.iter().any(|e| e.id == id))
                .then_some(i)
        })
    };

    if collaboration {
        writeln!(xml, r#"  <bpmn:collaboration id="Collaboration_1">"#)?;
        for (i, pool) in map.pools.iter().enumerate() {
            let name_attr = pool
                .name
                .as_deref()
                .map(|n| format!(r#" name="{}""#, xml_escape(n)))
                .unwrap_or_default();
            writeln!(
                xml,
                r#"    <bpmn:participant id="Participant_{}"{} processRef="{}" />"#,
                i + 1,
                name_attr,
                process_ids[i]
            )?;
        }
        for (n, conn) in map.connections.iter().enumerate() {
            if pool_of(&conn.from) != pool_of(&conn.to) {
                let name_attr = conn
                    .label
                    .as_deref()
                    .map(|l| format!(r#" name="{}""#, xml_escape(l)))
                    .unwrap_or_default();
                writeln!(
                    xml,
                    r#"    <bpmn:messageFlow id="MessageFlow_{}" sourceRef="{}" targetRef="{}"{} />"#,
                    n + 1,
                    sanitize_ncname(&conn.from),
                    sanitize_ncname(&conn.to),
                    name_attr
                )?;
            }
        }
        writeln!(xml, r#"  </bpmn:collaboration>"#)?;
    }

    for (i, pool) in map.pools.iter().enumerate() {
        writeln!(
            xml,
            r#"  <bpmn:process id="{}" isExecutable="false">"#,
            process_ids[i]
        )?;

        if pool.lanes.len() > 1 || collaboration {
            writeln!(xml, r#"    <bpmn:laneSet id="LaneSet_{}">"#, i + 1)?;
            for (j, lane) in pool.lanes.iter().enumerate() {
                writeln!(
                    xml,
                    r#"      <bpmn:lane id="Lane_{}_{}" name="{}">"#,
                    i + 1,
                    j + 1,
                    xml_escape(&lane.name)
                )?;
                for element in &lane.elements {
                    writeln!(
                        xml,
                        r#"        <bpmn:flowNodeRef>{}</bpmn:flowNodeRef>"#,
                        sanitize_ncname(&element.id)
                    )?;
                }
                writeln!(xml, r#"      </bpmn:lane>"#)?;
            }
            writeln!(xml, r#"    </bpmn:laneSet>"#)?;
        }

        for lane in &pool.lanes {
            for element in &lane.elements {
                write_flow_node(&mut xml, &sanitize_ncname(&element.id), element.kind, &element.label)?;
            }
        }

        for (n, conn) in map.connections.iter().enumerate() {
            let source_pool = pool_of(&conn.from);
            if source_pool == Some(i) && source_pool == pool_of(&conn.to) {
                let name_attr = conn
                    .label
                    .as_deref()
                    .map(|l| format!(r#" name="{}""#, xml_escape(l)))
                    .unwrap_or_default();
                writeln!(
                    xml,
                    r#"    <bpmn:sequenceFlow id="Flow_{}" sourceRef="{}" targetRef="{}"{} />"#,
                    n + 1,
                    sanitize_ncname(&conn.from),
                    sanitize_ncname(&conn.to),
                    name_attr
                )?;
            }
        }

        writeln!(xml, r#"  </bpmn:process>"#)?;
    }

    writeln!(xml, r#"</bpmn:definitions>"#)?;
    Ok(xml)
}

fn write_flow_node(xml: &mut String, id: &str, kind: ElementKind, label: &str) -> Result<()> {
    let name_attr = if label.is_empty() || matches!(kind, ElementKind::Start | ElementKind::End) {
        String::new()
    } else {
        format!(r#" name="{}""#, xml_escape(label))
    };

    match kind {
        ElementKind::Start => writeln!(xml, r#"    <bpmn:startEvent id="{}" />"#, id)?,
        ElementKind::End => writeln!(xml, r#"    <bpmn:endEvent id="{}" />"#, id)?,
        ElementKind::Task => writeln!(xml, r#"    <bpmn:task id="{}"{} />"#, id, name_attr)?,
        ElementKind::Subprocess => {
            writeln!(xml, r#"    <bpmn:subProcess id="{}"{} />"#, id, name_attr)?
        }
        ElementKind::ExclusiveGateway => {
            writeln!(xml, r#"    <bpmn:exclusiveGateway id="{}"{} />"#, id, name_attr)?
        }
        ElementKind::ParallelGateway => {
            writeln!(xml, r#"    <bpmn:parallelGateway id="{}"{} />"#, id, name_attr)?
        }
        ElementKind::InclusiveGateway => {
            writeln!(xml, r#"    <bpmn:inclusiveGateway id="{}"{} />"#, id, name_attr)?
        }
        ElementKind::EventGateway => {
            writeln!(xml, r#"    <bpmn:eventBasedGateway id="{}"{} />"#, id, name_attr)?
        }
        ElementKind::Intermediate => writeln!(
            xml,
            r#"    <bpmn:intermediateCatchEvent id="{}"{} />"#,
            id, name_attr
        )?,
        ElementKind::Timer => {
            writeln!(xml, r#"    <bpmn:intermediateCatchEvent id="{}"{}>"#, id, name_attr)?;
            writeln!(xml, r#"      <bpmn:timerEventDefinition />"#)?;
            writeln!(xml, r#"    </bpmn:intermediateCatchEvent>"#)?;
        }
        ElementKind::Message => {
            writeln!(xml, r#"    <bpmn:intermediateCatchEvent id="{}"{}>"#, id, name_attr)?;
            writeln!(xml, r#"      <bpmn:messageEventDefinition />"#)?;
            writeln!(xml, r#"    </bpmn:intermediateCatchEvent>"#)?;
        }
        ElementKind::Signal => {
            writeln!(xml, r#"    <bpmn:intermediateCatchEvent id="{}"{}>"#, id, name_attr)?;
            writeln!(xml, r#"      <bpmn:signalEventDefinition />"#)?;
            writeln!(xml, r#"    </bpmn:intermediateCatchEvent>"#)?;
        }
        ElementKind::Conditional => {
            writeln!(xml, r#"    <bpmn:intermediateCatchEvent id="{}"{}>"#, id, name_attr)?;
            writeln!(xml, r#"      <bpmn:conditionalEventDefinition />"#)?;
            writeln!(xml, r#"    </bpmn:intermediateCatchEvent>"#)?;
        }
        ElementKind::Link => {
            writeln!(xml, r#"    <bpmn:intermediateCatchEvent id="{}"{}>"#, id, name_attr)?;
            writeln!(xml, r#"      <bpmn:linkEventDefinition />"#)?;
            writeln!(xml, r#"    </bpmn:intermediateCatchEvent>"#)?;
        }
    }
    Ok(())
}

/// Escape text for use in an XML attribute value.
pub fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Reduce arbitrary text to a valid NCName: alphanumerics, `_`, `-`, `.`
/// survive, everything else becomes `_`, and a leading digit gets a `_`
/// prefix.
pub fn sanitize_ncname(text: &str) -> String {
    let mut out: String = text
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) || out.starts_with('-') || out.starts_with('.') {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piperflow::parse;

    const MINIMAL: &str = "title: T\nlane: L\n(start) as s\n(end) as e\ns->e";

    #[test]
    fn minimal_exports_single_process() {
        let xml = to_bpmn_xml(&parse(MINIMAL).unwrap()).unwrap();
        assert!(xml.contains(r#"<bpmn:process id="Process_1" isExecutable="false">"#));
        assert!(xml.contains(r#"<bpmn:startEvent id="s" />"#));
        assert!(xml.contains(r#"<bpmn:endEvent id="e" />"#));
        assert!(xml.contains(r#"<bpmn:sequenceFlow id="Flow_1" sourceRef="s" targetRef="e" />"#));
        assert!(!xml.contains("collaboration"));
    }

    #[test]
    fn export_is_deterministic() {
        let a = to_bpmn_xml(&parse(MINIMAL).unwrap()).unwrap();
        let b = to_bpmn_xml(&parse(MINIMAL).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn named_pools_export_collaboration_and_message_flows() {
        let notation = "\
title: T
lane: End User
(start) as s
pool: Back Office
lane: Clerk
[Review] as review
(end) as e
s->review->e";
        let xml = to_bpmn_xml(&parse(notation).unwrap()).unwrap();
        assert!(xml.contains(r#"<bpmn:collaboration id="Collaboration_1">"#));
        assert!(xml.contains(r#"name="Back Office" processRef="Process_Back_Office""#));
        // s and review live in different pools
        assert!(xml.contains(r#"<bpmn:messageFlow id="MessageFlow_1" sourceRef="s" targetRef="review" />"#));
        // review -> e stays a sequence flow inside the named pool
        assert!(xml.contains(r#"<bpmn:sequenceFlow id="Flow_2" sourceRef="review" targetRef="e" />"#));
    }

    #[test]
    fn labels_and_escaping() {
        let notation =
            "title: T\nlane: L\n(start) as s\n[Ship & \"Track\" <fast>] as ship\n(end) as e\ns->ship->e: done";
        let xml = to_bpmn_xml(&parse(notation).unwrap()).unwrap();
        assert!(xml.contains(r#"name="Ship &amp; &quot;Track&quot; &lt;fast&gt;""#));
        assert!(xml.contains(r#"targetRef="e" name="done""#));
    }

    #[test]
    fn gateway_and_event_definitions() {
        let notation = "\
title: T
lane: L
(start) as s
(@timer Hourly) as t
<Paid?> as paid
<@parallel Split> as split
(end) as e
s->t->paid->e";
        let xml = to_bpmn_xml(&parse(notation).unwrap()).unwrap();
        assert!(xml.contains(r#"<bpmn:timerEventDefinition />"#));
        assert!(xml.contains(r#"<bpmn:exclusiveGateway id="paid" name="Paid?" />"#));
        assert!(xml.contains(r#"<bpmn:parallelGateway id="split" name="Split" />"#));
    }

    #[test]
    fn lane_set_emitted_for_multiple_lanes() {
        let notation = "\
title: T
lane: A
(start) as s
lane: B
(end) as e
s->e";
        let xml = to_bpmn_xml(&parse(notation).unwrap()).unwrap();
        assert!(xml.contains(r#"<bpmn:lane id="Lane_1_1" name="A">"#));
        assert!(xml.contains(r#"<bpmn:flowNodeRef>s</bpmn:flowNodeRef>"#));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape(r#"a & <b> "c""#), "a &amp; &lt;b&gt; &quot;c&quot;");
    }

    #[test]
    fn test_sanitize_ncname() {
        assert_eq!(sanitize_ncname("search records"), "search_records");
        assert_eq!(sanitize_ncname("9lives"), "_9lives");
        assert_eq!(sanitize_ncname(""), "_");
        assert_eq!(sanitize_ncname("ok_id-1"), "ok_id-1");
    }
}
