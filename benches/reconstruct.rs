use std::path::Path;

use criterion::{criterion_group, criterion_main, Criterion};

use mailsalvage::config::ResolutionPolicy;
use mailsalvage::export::eml::render_eml;
use mailsalvage::folder::MaterializedFolder;
use mailsalvage::lookup::LookupTables;
use mailsalvage::model::record::{
    AttributeDefinition, Contact, ExportSet, Folder, Identity, MessageContent, MessageRecord,
};
use mailsalvage::reconstruct::{order_messages, ReconstructOptions, Reconstructor};

/// A synthetic export of `n` messages spread over 50 conversations.
fn synthetic_export(n: i64) -> ExportSet {
    let attributes = ["from", "to", "cc", "bcc"]
        .iter()
        .enumerate()
        .map(|(i, name)| AttributeDefinition {
            id: i as i64 + 1,
            name: name.to_string(),
        })
        .collect();
    let contacts = (0..100)
        .map(|id| Contact {
            id,
            name: format!("Contact {id}"),
        })
        .collect();
    let identities = (0..100)
        .map(|id| Identity {
            contact_id: id,
            kind: "email".to_string(),
            value: format!("contact{id}@example.com"),
        })
        .collect();
    let messages = (0..n)
        .rev()
        .map(|id| MessageRecord {
            id,
            date: 1_475_000_000_000_000 + id * 1_000_000,
            conversation_id: Some(id % 50),
            folder_id: Some(1),
            header_message_id: Some(format!("msg{id}@example.com")),
            json_attributes: format!(
                r#"{{"1": {}, "2": [{}, {}], "3": [{}], "4": []}}"#,
                id % 100,
                (id + 1) % 100,
                (id + 2) % 100,
                (id + 3) % 100
            ),
        })
        .collect();
    let contents = (0..n)
        .map(|id| MessageContent {
            docid: id,
            body: "Line one\nLine two\n".repeat(20),
            subject: format!("Subject {id}"),
            ..Default::default()
        })
        .collect();

    ExportSet {
        attributes,
        contacts,
        identities,
        folders: vec![Folder {
            id: 1,
            uri: "imap://bench@mail.example.com/INBOX".to_string(),
        }],
        messages,
        contents,
        ..Default::default()
    }
}

fn bench_reconstruct(c: &mut Criterion) {
    let export = synthetic_export(5_000);
    let root = Path::new("bench-output");
    let folders = vec![MaterializedFolder {
        id: 1,
        uri: export.folders[0].uri.clone(),
        path: root.join("bench").join("mail.example.com").join("INBOX"),
    }];
    let tables = LookupTables::build(&export, &folders, root);

    c.bench_function("reconstruct_5000", |b| {
        b.iter(|| {
            let ordered = order_messages(export.messages.clone());
            let mut reconstructor = Reconstructor::new(
                &tables,
                &export.contents,
                ReconstructOptions {
                    user_agent: "bench".to_string(),
                    policy: ResolutionPolicy::FailFast,
                },
            );
            let mut bytes = 0usize;
            reconstructor
                .reconstruct_all(&ordered.messages, |message| {
                    bytes += render_eml(&message).len();
                    Ok(())
                })
                .unwrap();
            bytes
        })
    });
}

criterion_group!(benches, bench_reconstruct);
criterion_main!(benches);
