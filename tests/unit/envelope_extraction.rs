//! Record extraction from drifting response envelopes

use plenary_speech_downloader::fetcher::envelope::{extract_records, flatten_record, SPEECH_RECORD_KEY};
use serde_json::json;

#[test]
fn test_three_casings_at_three_depths_concatenate_in_document_order() {
    let body = json!({
        "Pronunciamento": [{"id": "a"}],
        "Sessao": {
            "pronunciamento": [{"id": "b"}, {"id": "c"}],
            "Detalhe": {
                "Lista": [{"PRONUNCIAMENTO": [{"id": "d"}]}]
            }
        }
    });

    let ids: Vec<String> = extract_records(&body, SPEECH_RECORD_KEY)
        .iter()
        .map(|v| v["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);
}

#[test]
fn test_release_shaped_envelopes() {
    let older = json!({
        "DiscursosPlenario": {
            "Metadados": {"Versao": "1"},
            "Pronunciamentos": {"Pronunciamento": [{"CodigoPronunciamento": "1"}]}
        }
    });
    let newer = json!({
        "ListaPronunciamentos": [{"pronunciamento": [{"CodigoPronunciamento": "2"}]}]
    });

    assert_eq!(extract_records(&older, SPEECH_RECORD_KEY).len(), 1);
    assert_eq!(extract_records(&newer, SPEECH_RECORD_KEY).len(), 1);
}

#[test]
fn test_absent_key_is_empty_not_error() {
    assert!(extract_records(&json!({"Sessoes": []}), SPEECH_RECORD_KEY).is_empty());
    assert!(extract_records(&json!([1, "two", null]), SPEECH_RECORD_KEY).is_empty());
    assert!(extract_records(&json!("Pronunciamento"), SPEECH_RECORD_KEY).is_empty());
}

#[test]
fn test_flattened_record_uses_dotted_names() {
    let element = json!({
        "CodigoPronunciamento": "A1",
        "SessaoPlenaria": {"DataSessao": "2019-03-29", "Casa": {"Sigla": "SF"}},
        "Apartes": [{"Nome": "X"}]
    });
    let record = flatten_record(&element).unwrap();

    assert_eq!(record["SessaoPlenaria.DataSessao"], json!("2019-03-29"));
    assert_eq!(record["SessaoPlenaria.Casa.Sigla"], json!("SF"));
    assert_eq!(record["Apartes"], json!(r#"[{"Nome":"X"}]"#));
}
