//! Property-based tests for realtime frame decoding

use proptest::prelude::*;
use vitalsync::shared::RealtimeEvent;

proptest! {
    #[test]
    fn test_arbitrary_text_never_panics(text in ".*") {
        let _ = RealtimeEvent::from_frame(&text);
    }

    #[test]
    fn test_unknown_events_are_ignored(name in "[a-z]{1,12}(:[a-z]{1,8})?") {
        prop_assume!(name != "vitalSigns:update" && name != "alert:new");
        let frame = serde_json::json!({ "event": name, "data": { "anything": 1 } }).to_string();
        prop_assert_eq!(RealtimeEvent::from_frame(&frame).unwrap(), None);
    }

    #[test]
    fn test_vital_update_decodes_student_and_heart_rate(student in "[a-zA-Z0-9-]{1,24}", bpm in 30u16..220) {
        let frame = serde_json::json!({
            "event": "vitalSigns:update",
            "data": {
                "studentId": student,
                "data": { "heartRate": bpm, "recordedAt": "2026-03-02T08:00:00Z" },
                "timestamp": "2026-03-02T08:00:01Z"
            }
        })
        .to_string();

        match RealtimeEvent::from_frame(&frame).unwrap() {
            Some(RealtimeEvent::VitalSignsUpdate(update)) => {
                prop_assert_eq!(update.student_id, student);
                prop_assert_eq!(update.data.heart_rate, Some(bpm));
            }
            other => prop_assert!(false, "unexpected decode: {:?}", other),
        }
    }
}
