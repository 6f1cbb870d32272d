use domain::Platform;

use crate::services::support::Harness;
use crate::services::{RegisterPushDeviceRequest, RemovePushDeviceRequest};

#[tokio::test]
async fn register_replaces_token_for_same_device() {
    let harness = Harness::new();
    let user = harness.seed_user("mobile");

    harness
        .user_service
        .register_push_device(
            user.id,
            RegisterPushDeviceRequest {
                token: "ExponentPushToken[old]".into(),
                platform: Platform::Ios,
                device_id: Some("phone-1".into()),
            },
        )
        .await
        .unwrap();
    let updated = harness
        .user_service
        .register_push_device(
            user.id,
            RegisterPushDeviceRequest {
                token: "ExponentPushToken[new]".into(),
                platform: Platform::Ios,
                device_id: Some("phone-1".into()),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.push_devices.len(), 1);
    assert_eq!(
        updated.push_devices[0].token.as_str(),
        "ExponentPushToken[new]"
    );
}

#[tokio::test]
async fn remove_by_token_and_by_platform() {
    let harness = Harness::new();
    let user = harness.seed_user("multi");

    for (token, platform, device) in [
        ("ExponentPushToken[ios]", Platform::Ios, "phone"),
        ("ExponentPushToken[android]", Platform::Android, "tablet"),
        ("ExponentPushToken[web]", Platform::Web, "browser"),
    ] {
        harness
            .user_service
            .register_push_device(
                user.id,
                RegisterPushDeviceRequest {
                    token: token.into(),
                    platform,
                    device_id: Some(device.into()),
                },
            )
            .await
            .unwrap();
    }

    let updated = harness
        .user_service
        .remove_push_device(
            user.id,
            RemovePushDeviceRequest::ByToken("ExponentPushToken[web]".into()),
        )
        .await
        .unwrap();
    assert_eq!(updated.push_devices.len(), 2);

    let updated = harness
        .user_service
        .remove_push_device(
            user.id,
            RemovePushDeviceRequest::ByPlatform {
                platform: Platform::Ios,
                device_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.push_devices.len(), 1);
    assert_eq!(updated.push_devices[0].platform, Platform::Android);
}

#[tokio::test]
async fn update_last_seen_touches_timestamp() {
    let harness = Harness::new();
    let user = harness.seed_user("active");
    let before = user.last_seen;

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    harness.user_service.update_last_seen(user.id).await.unwrap();

    let stored = harness.users.get(user.id).unwrap();
    assert!(stored.last_seen > before);
}
