// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! End-to-end tests for the guest-share core

use gs_core::{
    Entry, GuestEvent, GuestId, GuestShare, GuestShareConfig, InitPhase, MemoryEntryProvider,
    PathNameResolver, SharePath, StaticVolumeSource, VolumeInfo, VolumeManager, VolumeType,
    event_channel, volume_registry_initializer,
};
use std::sync::Arc;

const MY_FILES: &str = "/home/chronos/MyFiles";

fn my_files_volumes() -> Vec<VolumeInfo> {
    vec![
        VolumeInfo::new("my_files", VolumeType::Downloads, MY_FILES),
        VolumeInfo::new(
            "crostini",
            VolumeType::Crostini,
            "/media/fuse/crostini_user_termina_penguin",
        ),
        VolumeInfo::new("drive", VolumeType::Drive, "/media/fuse/drivefs"),
    ]
}

async fn service() -> Arc<GuestShare> {
    let initializer = volume_registry_initializer(Arc::new(StaticVolumeSource::new(
        my_files_volumes(),
    )));
    let volumes = initializer.get_instance().await.unwrap();
    Arc::new(GuestShare::new(Default::default(), volumes))
}

#[tokio::test]
async fn test_share_downloads_then_subfolder() {
    let service = service().await;
    let guest = GuestId::default_guest();
    let (tx, rx) = event_channel(16);
    let consumer = service.clone().listen(rx);

    let downloads = Entry::directory(format!("{MY_FILES}/Downloads").as_str(), MY_FILES);
    let sub = Entry::directory(format!("{MY_FILES}/Downloads/Sub").as_str(), MY_FILES);

    tx.send(GuestEvent::enable(&guest)).await.unwrap();
    tx.send(GuestEvent::Share {
        vm_name: guest.vm_name.clone(),
        entries: vec![downloads.clone()],
    })
    .await
    .unwrap();
    tx.send(GuestEvent::Share {
        vm_name: guest.vm_name.clone(),
        entries: vec![sub.clone()],
    })
    .await
    .unwrap();
    drop(tx);
    consumer.await.unwrap();

    let table = service.shared_paths();
    assert_eq!(table.len(), 1);
    assert_eq!(
        table.get(&SharePath::parse(&format!("{MY_FILES}/Downloads"))),
        Some(&vec!["termina".to_string()])
    );
    assert!(service.is_path_shared("termina", &sub));
    assert!(service.can_share_path("termina", &sub, true));
}

#[tokio::test]
async fn test_policy_through_volume_registry() {
    let service = service().await;
    service.set_enabled("termina", "penguin", true);
    service.set_enabled("PvmDefault", "", true);

    let crostini_root = "/media/fuse/crostini_user_termina_penguin";
    let crostini = Entry::directory(format!("{crostini_root}/projects").as_str(), crostini_root);
    assert!(!service.can_share_path("termina", &crostini, false));
    assert!(service.can_share_path("PvmDefault", &crostini, false));

    let drive = "/media/fuse/drivefs";
    let computers = Entry::directory(format!("{drive}/Computers").as_str(), drive);
    let laptop = Entry::directory(format!("{drive}/Computers/Laptop").as_str(), drive);
    let laptop_docs = Entry::directory(format!("{drive}/Computers/Laptop/Docs").as_str(), drive);
    assert!(!service.can_share_path("termina", &computers, false));
    assert!(!service.can_share_path("termina", &laptop, false));
    assert!(service.can_share_path("termina", &laptop_docs, false));

    let my_drive = Entry::directory(format!("{drive}/root/Work").as_str(), drive);
    assert!(service.can_share_path("termina", &my_drive, true));

    let outside = Entry::directory("/tmp/elsewhere", "/tmp");
    assert!(!service.can_share_path("termina", &outside, false));
}

#[tokio::test]
async fn test_parent_segments_cannot_leave_the_volume() {
    let service = service().await;
    service.set_enabled("termina", "penguin", true);
    service.register_shared_path(
        "termina",
        &Entry::directory(format!("{MY_FILES}/Downloads").as_str(), MY_FILES),
    );

    let etc = Entry::directory(format!("{MY_FILES}/../../../etc").as_str(), MY_FILES);
    assert_eq!(etc.path, SharePath::parse("/etc"));
    assert!(!service.can_share_path("termina", &etc, true));

    let escaped = Entry::directory(
        format!("{MY_FILES}/Downloads/../../../../etc").as_str(),
        MY_FILES,
    );
    assert!(!service.is_path_shared("termina", &escaped));
}

#[tokio::test]
async fn test_volume_registry_singleton_under_concurrency() {
    let initializer = Arc::new(volume_registry_initializer(Arc::new(
        StaticVolumeSource::new(my_files_volumes()),
    )));
    assert_eq!(initializer.phase(), InitPhase::Uninitialized);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let initializer = initializer.clone();
            tokio::spawn(async move { initializer.get_instance().await.unwrap() })
        })
        .collect();

    let mut instances = Vec::new();
    for handle in handles {
        instances.push(handle.await.unwrap());
    }
    for instance in &instances[1..] {
        assert!(Arc::ptr_eq(&instances[0], instance));
    }
    assert_eq!(initializer.phase(), InitPhase::Ready);
    assert_eq!(instances[0].volumes().len(), 3);

    let entry = Entry::directory(format!("{MY_FILES}/Downloads").as_str(), MY_FILES);
    assert!(instances[0].location_info(&entry).is_some());

    initializer.revoke_for_testing();
    assert_eq!(initializer.phase(), InitPhase::Uninitialized);
    assert!(initializer.get_instance_for_debug().is_none());
    let fresh = initializer.get_instance().await.unwrap();
    assert!(!Arc::ptr_eq(&instances[0], &fresh));
}

#[tokio::test]
async fn test_config_seeds_service() {
    let config = GuestShareConfig::from_toml_str(&format!(
        r#"
[[volumes]]
volume-id = "my_files"
volume-type = "downloads"
root = "{MY_FILES}"

[[guests]]
vm-name = "termina"
container-name = "penguin"

[[shared]]
vm-name = "termina"
path = "{MY_FILES}/Downloads"
filesystem-root = "{MY_FILES}"
"#
    ))
    .unwrap();

    let initializer = volume_registry_initializer(Arc::new(config.volume_source()));
    let volumes = initializer.get_instance().await.unwrap();
    let service = GuestShare::from_config(&config, volumes);

    let photo = Entry::file(format!("{MY_FILES}/Downloads/a.jpg").as_str(), MY_FILES);
    assert!(service.is_enabled("termina"));
    assert!(service.is_path_shared("termina", &photo));
    assert!(service.can_share_path("termina", &photo, false));
    assert!(!service.can_share_path("termina", &photo, true));
}

#[tokio::test]
async fn test_dedup_before_copy() {
    let provider = Arc::new(MemoryEntryProvider::new(MY_FILES));
    provider
        .add_file(&format!("{MY_FILES}/Downloads/report.pdf"), b"v1")
        .unwrap();
    let resolver = PathNameResolver::new(provider.clone());
    let root = provider.root_entry();

    let downloads = resolver.resolve_path(&root, "/Downloads").await.unwrap();
    let name = resolver
        .deduplicate_path(&downloads, "report.pdf")
        .await
        .unwrap();
    assert_eq!(name, "report (1).pdf");

    let created = resolver
        .provider()
        .create_file(&downloads, &name)
        .await
        .unwrap();
    resolver.provider().write(&created, b"v2").await.unwrap();
    assert_eq!(
        provider.read(&format!("{MY_FILES}/Downloads/report (1).pdf")),
        Some(b"v2".to_vec())
    );
    assert_eq!(
        resolver
            .deduplicate_path(&downloads, "report.pdf")
            .await
            .unwrap(),
        "report (2).pdf"
    );
}
