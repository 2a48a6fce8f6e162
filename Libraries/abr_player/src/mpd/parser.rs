use crate::error::{PlayerError, PlayerResult};
use crate::mpd::{AdaptationSet, MpdMetadata, Representation, SegmentEntry};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;

fn infer_content_type(mime_type: &str) -> &str {
    if mime_type.contains("audio") {
        "audio"
    } else {
        "video" // fallback
    }
}

fn apply_segment_template(rep: &mut Representation, template: &HashMap<String, String>) {
    rep.initialization = template
        .get("initialization")
        .map(String::as_str)
        .unwrap_or("")
        .replace("$RepresentationID$", &rep.id);
    rep.media = template
        .get("media")
        .map(String::as_str)
        .unwrap_or("")
        .replace("$RepresentationID$", &rep.id);

    if let Some(dur) = template.get("duration") {
        rep.segment_duration = dur.parse::<f64>().unwrap_or(1.0);
    }
    if let Some(ts) = template.get("timescale") {
        rep.timescale = ts.parse::<u64>().unwrap_or(1).max(1);
    }
    if let Some(sn) = template.get("startNumber") {
        rep.start_number = sn.parse::<u64>().unwrap_or(1);
    }

    rep.segment_duration /= rep.timescale as f64;
    rep.has_template = !rep.media.is_empty();
}

pub fn parse_mpd(xml: &str) -> PlayerResult<MpdMetadata> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut adaptation_sets = vec![];
    let mut media_presentation_duration = 0.0;
    let mut inside_rep = false;

    let mut current_adaptation: Option<AdaptationSet> = None;
    let mut current_rep: Option<Representation> = None;
    let mut adaptation_template: Option<HashMap<String, String>> = None;
    let mut list_segment_duration = 0.0;

    while let Ok(event) = reader.read_event_into(&mut buf) {
        let self_closing = matches!(event, Event::Empty(_));
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                match e.name().as_ref() {
                    b"MPD" => {
                        for attr in e.attributes().flatten() {
                            let key = attr.key.as_ref();
                            let value = attr.unescape_value().unwrap_or_default();
                            if key == b"type" && value == "dynamic" {
                                return Err(PlayerError::InvalidManifest(
                                    "dynamic presentations are not supported".to_string(),
                                ));
                            }
                            if key == b"mediaPresentationDuration" {
                                media_presentation_duration =
                                    parse_iso_duration(&value).unwrap_or(0.0);
                            }
                        }
                    }
                    b"AdaptationSet" => {
                        let mut mime = String::new();
                        let mut content = String::new();

                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"mimeType" => {
                                    mime = attr.unescape_value().unwrap_or_default().to_string()
                                }
                                b"contentType" => {
                                    content = attr.unescape_value().unwrap_or_default().to_string()
                                }
                                _ => {}
                            }
                        }

                        let fallback = infer_content_type(&mime).to_string();
                        let adaptation = AdaptationSet {
                            content_type: if !content.is_empty() { content } else { fallback },
                            mime_type: mime,
                            representations: vec![],
                        };
                        if self_closing {
                            adaptation_sets.push(adaptation);
                        } else {
                            current_adaptation = Some(adaptation);
                        }
                    }
                    b"Representation" => {
                        let mut id = String::new();
                        let mut bandwidth = 0;

                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"id" => id = attr.unescape_value().unwrap_or_default().to_string(),
                                b"bandwidth" => {
                                    bandwidth = attr
                                        .unescape_value()
                                        .unwrap_or_default()
                                        .parse::<u64>()
                                        .unwrap_or(0);
                                }
                                _ => {}
                            }
                        }

                        let rep = Representation {
                            id,
                            bandwidth,
                            initialization: String::new(),
                            media: String::new(),
                            segment_duration: 0.0,
                            timescale: 1,
                            start_number: 1,
                            segments: vec![],
                            has_template: false,
                        };

                        if self_closing {
                            // No child elements follow; an adaptation-level
                            // template is applied when the set closes.
                            if let Some(adaptation) = current_adaptation.as_mut() {
                                adaptation.representations.push(rep);
                            }
                        } else {
                            inside_rep = true;
                            current_rep = Some(rep);
                        }
                    }
                    b"SegmentTemplate" => {
                        let mut map = HashMap::new();
                        for attr in e.attributes().flatten() {
                            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                            let value = attr.unescape_value().unwrap_or_default().to_string();
                            map.insert(key, value);
                        }

                        if inside_rep {
                            if let Some(rep) = current_rep.as_mut() {
                                apply_segment_template(rep, &map);
                            }
                        } else {
                            adaptation_template = Some(map);
                        }
                    }
                    b"SegmentList" => {
                        let mut duration = 0.0;
                        let mut timescale = 1.0;
                        for attr in e.attributes().flatten() {
                            let value = attr.unescape_value().unwrap_or_default();
                            match attr.key.as_ref() {
                                b"duration" => duration = value.parse::<f64>().unwrap_or(0.0),
                                b"timescale" => timescale = value.parse::<f64>().unwrap_or(1.0),
                                _ => {}
                            }
                        }
                        list_segment_duration = duration / timescale.max(1.0);
                        if let Some(rep) = current_rep.as_mut() {
                            rep.segment_duration = list_segment_duration;
                        }
                    }
                    b"Initialization" => {
                        if let Some(rep) = current_rep.as_mut() {
                            for attr in e.attributes().flatten() {
                                if attr.key.as_ref() == b"sourceURL" {
                                    rep.initialization =
                                        attr.unescape_value().unwrap_or_default().to_string();
                                }
                            }
                        }
                    }
                    b"SegmentURL" => {
                        if let Some(rep) = current_rep.as_mut() {
                            for attr in e.attributes().flatten() {
                                if attr.key.as_ref() == b"media" {
                                    rep.segments.push(SegmentEntry {
                                        media: attr
                                            .unescape_value()
                                            .unwrap_or_default()
                                            .to_string(),
                                        presentation_time: 0.0,
                                        duration: list_segment_duration,
                                    });
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }

            Event::End(ref e) => match e.name().as_ref() {
                b"Representation" => {
                    inside_rep = false;
                    if let Some(mut rep) = current_rep.take() {
                        // Segment start times follow from the list order.
                        let mut cursor = 0.0;
                        for entry in rep.segments.iter_mut() {
                            entry.presentation_time = cursor;
                            cursor += entry.duration;
                        }

                        if let Some(adaptation) = current_adaptation.as_mut() {
                            adaptation.representations.push(rep);
                        }
                    }
                }
                b"AdaptationSet" => {
                    if let Some(mut adapt) = current_adaptation.take() {
                        if let Some(template) = adaptation_template.take() {
                            for rep in adapt.representations.iter_mut() {
                                if !rep.has_template && rep.segments.is_empty() {
                                    apply_segment_template(rep, &template);
                                }
                            }
                        }
                        adaptation_sets.push(adapt);
                    }
                }
                _ => {}
            },

            Event::Eof => break,
            _ => {}
        }

        buf.clear();
    }

    if adaptation_sets.is_empty() {
        return Err(PlayerError::InvalidManifest(
            "manifest contains no adaptation sets".to_string(),
        ));
    }

    Ok(MpdMetadata {
        media_presentation_duration,
        adaptation_sets,
    })
}

fn parse_iso_duration(value: &str) -> Option<f64> {
    let iso = iso8601_duration::Duration::parse(value).ok()?;
    iso.to_std().map(|d| d.as_secs_f64())
}
