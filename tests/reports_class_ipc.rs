use serde_json::json;

mod test_support;

use test_support::{request_err, request_ok, spawn_sidecar};

fn o_level_student(id: &str, name: &str, marks: [Option<u32>; 7]) -> serde_json::Value {
    let codes = ["ENG", "MATH", "KISW", "BIO", "CHEM", "PHY", "GEO"];
    let results: Vec<serde_json::Value> = codes
        .iter()
        .zip(marks)
        .map(|(code, m)| {
            json!({
                "subjectId": code.to_lowercase(),
                "subjectCode": code,
                "marksObtained": m,
            })
        })
        .collect();
    json!({ "studentId": id, "name": name, "results": results })
}

#[test]
fn class_report_ranks_sorts_and_summarizes() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let students = json!([
        o_level_student("s1", "Baraka", [80, 70, 60, 50, 40, 30, 20].map(Some)),
        o_level_student("s2", "Amina", [90, 90, 90, 90, 90, 90, 90].map(Some)),
        o_level_student("s3", "Chausiku", [None; 7]),
    ]);

    let report = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "reports.class",
        json!({
            "curriculum": "O-Level",
            "students": students,
            "sortBy": "name",
            "sortDir": "desc",
        }),
    );

    assert_eq!(report["curriculum"], json!("O-Level"));
    assert_eq!(report["sortBy"], json!("name"));
    assert_eq!(report["sortDir"], json!("desc"));

    let rows = report["students"].as_array().expect("students");
    let order: Vec<(&str, u64)> = rows
        .iter()
        .map(|r| {
            (
                r["studentId"].as_str().unwrap_or_default(),
                r["rank"].as_u64().unwrap_or_default(),
            )
        })
        .collect();
    assert_eq!(order, vec![("s3", 3), ("s1", 2), ("s2", 1)]);

    assert_eq!(rows[0]["selection"]["division"], json!("N/A"));
    assert_eq!(rows[0]["averageMarks"], json!("N/A"));
    assert_eq!(rows[1]["selection"]["totalPoints"], json!(22));
    assert_eq!(rows[2]["selection"]["division"], json!("I"));

    assert_eq!(report["divisionSummary"]["I"], json!(1));
    assert_eq!(report["divisionSummary"]["III"], json!(1));
    assert_eq!(report["divisionSummary"]["N/A"], json!(1));
    assert_eq!(report["divisionSummary"]["0"], json!(0));

    let overall = &report["overallPerformance"];
    assert_eq!(overall["studentCount"], json!(3));
    assert_eq!(overall["totalPassed"], json!(2));
    assert_eq!(overall["passRate"], json!(66.67));
    assert_eq!(overall["examGpa"], json!(14.5));

    let eng = &report["subjectPerformance"]["eng"];
    assert_eq!(eng["registeredCount"], json!(2));
    assert_eq!(eng["gradeCounts"]["A"], json!(2));
    assert_eq!(eng["passRate"], json!(100.0));

    assert!(report["generatedAt"].as_str().is_some());

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn class_report_rejects_unknown_sort_field() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let code = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "reports.class",
        json!({ "curriculum": "O-Level", "students": [], "sortBy": "shoeSize" }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "reports.class",
        json!({ "curriculum": "O-Level", "students": [], "sortDir": "sideways" }),
    );
    assert_eq!(code, "bad_params");

    let empty = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "reports.class",
        json!({ "curriculum": "A-Level", "students": [] }),
    );
    assert_eq!(empty["students"], json!([]));
    assert_eq!(empty["overallPerformance"]["passRate"], json!("N/A"));
    assert_eq!(empty["overallPerformance"]["examGpa"], json!("N/A"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn student_report_flags_a_level_gaps() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let report = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "reports.student",
        json!({
            "curriculum": "A-Level",
            "student": {
                "studentId": "a1",
                "results": [
                    { "subjectId": "phy", "marks": 82, "isPrincipal": true },
                    { "subjectId": "chem", "marks": 71, "isPrincipal": true },
                    { "subjectId": "gs", "marks": 55 }
                ]
            }
        }),
    );

    assert_eq!(report["studentId"], json!("a1"));
    assert_eq!(report["selection"]["totalPoints"], json!(3));
    assert_eq!(report["selection"]["missingCount"], json!(1));
    assert_eq!(report["selection"]["isValid"], json!(false));
    let codes: Vec<&str> = report["selection"]["warnings"]
        .as_array()
        .expect("warnings")
        .iter()
        .filter_map(|w| w["code"].as_str())
        .collect();
    assert!(codes.contains(&"missing_principal_flag"));
    assert!(codes.contains(&"insufficient_subjects"));
    assert!(codes.contains(&"insufficient_subsidiaries"));
    assert!(report["results"]
        .as_array()
        .expect("results")
        .iter()
        .all(|r| r["studentId"] == json!("a1")));

    drop(stdin);
    let _ = child.wait();
}
