use evaluation_forms::{
    assemble, build_field, compute_status, match_criteria, resolve, Answer, AnswerValue,
    ChoicePolicy, CompletionStatus, Criterion, CsvSource, Evaluator, FormError, FormOutcome,
    InputKind, LabelDictionary, NormalizationTable, Profile, SourceTables, SqliteSink,
    SubmissionSink, TableCache, WidgetKind,
};
use std::fs;
use std::path::Path;

fn scenario_table() -> NormalizationTable {
    NormalizationTable::new(
        LabelDictionary::from_pairs([("Tecnico", "Técnico")]).unwrap(),
        LabelDictionary::from_pairs([("Facultad", "FACULTADES Y DEPARTAMENTOS")]).unwrap(),
        None,
    )
}

fn scenario_profile() -> Profile {
    Profile::new(
        "20038222",
        "Ana Torres",
        "Técnico",
        "Facultad de Ingeniería",
        "FACULTADES Y DEPARTAMENTOS",
    )
}

#[test]
fn matched_criterion_becomes_boolean_answer() {
    let table = scenario_table();
    let profiles = vec![scenario_profile()];
    let catalog = vec![Criterion::new(
        "Asiste puntualmente",
        "Tecnico",
        "Facultad",
        InputKind::from_raw(Some("si_no")),
    )];

    let profile = resolve("20038222", &profiles).unwrap();
    let matched = match_criteria(profile, &catalog, &table);
    assert_eq!(matched, catalog);

    let field = build_field(&matched[0], &ChoicePolicy::default());
    assert_eq!(field.widget_kind, WidgetKind::BooleanChoice);

    let submission = assemble(profile, vec![Answer::new("Asiste puntualmente", "No")], "");
    assert_eq!(
        submission.answers(),
        &[Answer {
            criterion_description: "Asiste puntualmente".to_string(),
            value: AnswerValue::Text("No".to_string()),
        }]
    );
}

#[test]
fn empty_catalog_is_not_an_error() {
    let profile = scenario_profile();
    assert!(match_criteria(&profile, &[], &scenario_table()).is_empty());
}

#[test]
fn unknown_profile_is_not_found() {
    let profiles = vec![scenario_profile()];
    assert!(matches!(
        resolve("999", &profiles),
        Err(FormError::NotFound { .. })
    ));
}

#[test]
fn status_preserves_leading_zeros() {
    let seven = ["7".to_string()].into_iter().collect();
    let double_o_seven = ["007".to_string()].into_iter().collect();
    assert_eq!(compute_status("007", &seven), CompletionStatus::Pending);
    assert_eq!(compute_status("007", &double_o_seven), CompletionStatus::Done);
}

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn csv_tables_through_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let profiles_csv = write(
        dir.path(),
        "postulantes.csv",
        "Cedula,Nombre,Categoria,Unidad,Tipo_Unidad\n\
         20038222,Ana Torres,Técnico,Facultad de Ingeniería,FACULTADES Y DEPARTAMENTOS\n\
         0042,Luis Mena,Docente,Sede Norte,Sede\n",
    );
    let criteria_csv = write(
        dir.path(),
        "funciones.csv",
        "Categoria,Tipo_Unidad,Funcion,Tipo\n\
         Tecnico,Facultad,Asiste puntualmente,si_no\n\
         Tecnico,Facultad,Horas de capacitación,numero\n\
         Administrativo,Facultad,Atiende público,si_no\n",
    );

    let mut cache = TableCache::new(CsvSource::new(&profiles_csv, &criteria_csv));
    let tables = cache.tables().unwrap();
    let labels = scenario_table();
    let evaluator = Evaluator::new(&tables, &labels, ChoicePolicy::default());

    match evaluator.prepare_form("20038222").unwrap() {
        FormOutcome::Ready { schema, .. } => assert_eq!(schema.len(), 2),
        other => panic!("expected a form, got {:?}", other),
    }
    assert!(matches!(
        evaluator.prepare_form("0042").unwrap(),
        FormOutcome::NoCriteria { .. }
    ));

    let sink = SqliteSink::open(&dir.path().join("ledger.db")).unwrap();
    let receipt = evaluator
        .finalize("20038222", vec![Answer::new("Asiste puntualmente", "Yes")], "", &sink)
        .unwrap();
    assert_eq!(receipt.answer_count, 2);

    let submitted = sink.list_submitted_ids().unwrap();
    assert!(submitted.contains("20038222"));
    assert!(!submitted.contains("0042"));
    assert!(!submitted.contains("42"));

    // A new row shows up only after invalidation
    write(
        dir.path(),
        "postulantes.csv",
        "Cedula,Nombre,Categoria,Unidad,Tipo_Unidad\n\
         20038222,Ana Torres,Técnico,Facultad de Ingeniería,FACULTADES Y DEPARTAMENTOS\n\
         0042,Luis Mena,Docente,Sede Norte,Sede\n\
         0099,Eva Ruiz,Tecnico,Facultad de Artes,Facultad\n",
    );
    assert_eq!(cache.tables().unwrap().profiles.len(), 2);
    cache.invalidate();
    assert_eq!(cache.tables().unwrap().profiles.len(), 3);

    let source = CsvSource::new(&profiles_csv, &criteria_csv);
    assert_eq!(source.profiles().unwrap()[2].id, "0099");
}

#[test]
fn oldest_sheets_join_on_unidad() {
    let dir = tempfile::tempdir().unwrap();
    let profiles_csv = write(
        dir.path(),
        "postulantes.csv",
        "Nombre,Categoria,Unidad\n\
         Ana Torres,Tecnico,Facultad\n",
    );
    let criteria_csv = write(
        dir.path(),
        "funciones.csv",
        "Categoria,Unidad,Funcion\n\
         Técnico,FACULTADES Y DEPARTAMENTOS,Asiste puntualmente\n",
    );

    let tables = CsvSource::new(&profiles_csv, &criteria_csv).load().unwrap();
    let labels = scenario_table();
    let evaluator = Evaluator::new(&tables, &labels, ChoicePolicy::default());

    match evaluator.prepare_form("Ana Torres").unwrap() {
        FormOutcome::Ready { schema, .. } => {
            assert_eq!(schema.len(), 1);
            assert_eq!(schema.fields[0].widget_kind, WidgetKind::Text);
        }
        other => panic!("expected a form, got {:?}", other),
    }
}
