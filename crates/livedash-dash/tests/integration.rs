//! Integration tests for livedash-dash

use std::sync::Arc;

use livedash_dash::{AudioInfo, DynamicMpd, Error, VideoInfo};
use quick_xml::events::Event;
use quick_xml::Reader;

fn video_info() -> VideoInfo {
    VideoInfo {
        timescale: 90_000,
        width: 1920,
        height: 1080,
        frame_rate: 30,
        bitrate: 4_000_000,
        codecs: "avc1.640028".to_string(),
    }
}

fn audio_info() -> AudioInfo {
    AudioInfo {
        timescale: 44_100,
        sample_rate: 44_100,
        bitrate: 96_000,
        channels: 2,
        sample_size: 16,
        codecs: "mp4a.40.2".to_string(),
    }
}

/// Element names in document order, with `(t, d)` for each `<S>`.
fn outline(xml: &str) -> (Vec<String>, Vec<(u64, i64)>) {
    let mut reader = Reader::from_str(xml);
    let mut names = Vec::new();
    let mut entries = Vec::new();

    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) | Event::Empty(e) => {
                let name = String::from_utf8(e.name().as_ref().to_vec()).unwrap();
                if name == "S" {
                    let mut t = 0;
                    let mut d = 0;
                    for attr in e.attributes() {
                        let attr = attr.unwrap();
                        let value = attr.unescape_value().unwrap();
                        match attr.key.as_ref() {
                            b"t" => t = value.parse().unwrap(),
                            b"d" => d = value.parse().unwrap(),
                            _ => {}
                        }
                    }
                    entries.push((t, d));
                }
                names.push(name);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    (names, entries)
}

#[test]
fn test_document_structure() {
    let mpd = DynamicMpd::new(500, 4);
    mpd.set_video_info(video_info()).unwrap();
    mpd.set_audio_info(audio_info()).unwrap();
    mpd.append_video(180_000, vec![1u8; 32]).unwrap();
    mpd.append_audio(88_200, vec![2u8; 8]).unwrap();

    let xml = mpd.generate_xml().unwrap();
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));

    let (names, entries) = outline(&xml);
    assert_eq!(
        names,
        [
            "MPD",
            "Period",
            "AdaptationSet",
            "Role",
            "SegmentTemplate",
            "SegmentTimeline",
            "S",
            "Representation",
            "AdaptationSet",
            "AudioChannelConfiguration",
            "Role",
            "SegmentTemplate",
            "SegmentTimeline",
            "S",
            "Representation",
        ]
    );
    assert_eq!(entries, [(0, 180_000), (0, 88_200)]);

    // Two seconds of video drives the buffer; 500 ms is under a third of it
    assert!(xml.contains(r#"minBufferTime="PT2.000S""#));
    assert!(xml.contains(r#"minimumUpdatePeriod="PT1.000S""#));
}

#[test]
fn test_timeline_follows_eviction() {
    let mpd = DynamicMpd::new(1000, 3);
    mpd.set_video_info(video_info()).unwrap();

    let stamps: Vec<i64> = (0..5)
        .map(|i| mpd.append_video(3000 + i, vec![i as u8]).unwrap())
        .collect();

    assert!(matches!(mpd.video_segment(stamps[1]), Err(Error::NotFound(_))));
    assert_eq!(mpd.video_segment(stamps[4]).unwrap().as_ref(), &[4u8]);

    let (_, entries) = outline(&mpd.generate_xml().unwrap());
    let expected: Vec<(u64, i64)> = (2..5)
        .map(|i| (stamps[i as usize] as u64, 3000 + i))
        .collect();
    assert_eq!(entries, expected);
}

#[test]
fn test_concurrent_append_and_generate() {
    let mpd = Arc::new(DynamicMpd::new(1000, 10));
    mpd.set_video_info(video_info()).unwrap();
    mpd.set_audio_info(audio_info()).unwrap();

    std::thread::scope(|scope| {
        let video = Arc::clone(&mpd);
        scope.spawn(move || {
            for _ in 0..200 {
                video.append_video(3000, vec![0u8; 64]).unwrap();
            }
        });
        let audio = Arc::clone(&mpd);
        scope.spawn(move || {
            for _ in 0..200 {
                audio.append_audio(1024, vec![0u8; 16]).unwrap();
            }
        });
        let reader = Arc::clone(&mpd);
        scope.spawn(move || {
            for _ in 0..50 {
                let doc = reader.snapshot().unwrap();
                for set in &doc.adaptation_sets {
                    let timeline = &set.template.timeline;
                    assert!(timeline.len() <= 10);
                    assert!(timeline.windows(2).all(|w| w[1].t > w[0].t));
                }
            }
        });
    });

    let doc = mpd.snapshot().unwrap();
    assert_eq!(doc.adaptation_sets[0].template.timeline.len(), 10);
    assert_eq!(doc.adaptation_sets[0].template.timeline[9].t, 199 * 3000);
    assert_eq!(doc.adaptation_sets[1].template.timeline[9].t, 199 * 1024);
}

#[test]
fn test_concurrent_set_info_single_winner() {
    let mpd = DynamicMpd::new(1000, 4);

    let winners: usize = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4u32)
            .map(|i| {
                let mpd = &mpd;
                scope.spawn(move || {
                    let mut info = video_info();
                    info.width = 100 + i;
                    mpd.set_video_info(info).unwrap() as usize
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(winners, 1);
    assert!((100..104).contains(&mpd.video_info().unwrap().width));
}
