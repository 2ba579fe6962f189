use gradebook::{resolve_grade, Curriculum, CurriculumRules, MarksEntry};

fn grade_of(marks: f64, rules: &CurriculumRules) -> (String, u32) {
    let out = resolve_grade(&MarksEntry::Value(marks), rules).expect("resolve");
    assert!(out.warning.is_none(), "unexpected warning for {}", marks);
    (out.grade, out.points)
}

#[test]
fn every_mark_lands_in_exactly_one_band() {
    for c in Curriculum::ALL {
        let rules = CurriculumRules::for_curriculum(c);
        for m in 0..=100_u32 {
            let matching: Vec<_> = rules
                .grades
                .iter()
                .filter(|b| m >= b.min_marks && m <= b.max_marks)
                .collect();
            assert_eq!(matching.len(), 1, "{} marks {}", c, m);
            let (grade, points) = grade_of(f64::from(m), &rules);
            assert_eq!(grade, matching[0].grade, "{} marks {}", c, m);
            assert_eq!(points, matching[0].points, "{} marks {}", c, m);
        }
    }
}

#[test]
fn o_level_boundaries() {
    let rules = CurriculumRules::o_level();
    let cases = [
        (100.0, "A", 1),
        (75.0, "A", 1),
        (74.0, "B", 2),
        (65.0, "B", 2),
        (64.0, "C", 3),
        (45.0, "C", 3),
        (44.0, "D", 4),
        (30.0, "D", 4),
        (29.0, "F", 5),
        (0.0, "F", 5),
    ];
    for (m, grade, points) in cases {
        assert_eq!(grade_of(m, &rules), (grade.to_string(), points), "marks {}", m);
    }
}

#[test]
fn a_level_boundaries() {
    let rules = CurriculumRules::a_level();
    let cases = [
        (100.0, "A", 1),
        (80.0, "A", 1),
        (79.0, "B", 2),
        (70.0, "B", 2),
        (69.0, "C", 3),
        (60.0, "C", 3),
        (59.0, "D", 4),
        (50.0, "D", 4),
        (49.0, "E", 5),
        (40.0, "E", 5),
        (39.0, "S", 6),
        (35.0, "S", 6),
        (34.0, "F", 7),
        (0.0, "F", 7),
    ];
    for (m, grade, points) in cases {
        assert_eq!(grade_of(m, &rules), (grade.to_string(), points), "marks {}", m);
    }
}
