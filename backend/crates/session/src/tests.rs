//! Scenario tests for the session crate
//! Covers token handling, admission control, the coordinator and the router.

#[cfg(test)]
mod support {
    use std::sync::Arc;

    use platform::crypto::Signer;

    use crate::application::config::SessionConfig;
    use crate::application::coordinator::SessionCoordinator;
    use crate::domain::entity::live_session::{DescriptorFields, LiveSessionDescriptor};
    use crate::domain::value_object::{session_name::SessionName, user_id::UserId};
    use crate::infra::memory::InMemoryCluster;

    pub type Coordinator =
        SessionCoordinator<InMemoryCluster, InMemoryCluster, InMemoryCluster, InMemoryCluster>;

    pub fn config() -> SessionConfig {
        SessionConfig {
            node_id: "node-a".to_string(),
            ..SessionConfig::development()
        }
    }

    pub fn coordinator(cluster: &InMemoryCluster, config: &SessionConfig) -> Coordinator {
        SessionCoordinator::new(
            Arc::new(cluster.clone()),
            Arc::new(cluster.clone()),
            Arc::new(cluster.clone()),
            Arc::new(cluster.clone()),
            Arc::new(config.clone()),
            config.signer().unwrap(),
            config.node().unwrap(),
        )
    }

    pub fn signer(config: &SessionConfig) -> Signer {
        config.signer().unwrap()
    }

    pub fn user(raw: &str) -> UserId {
        UserId::new(raw).unwrap()
    }

    pub fn name_of(raw: &str) -> SessionName {
        SessionName::derive(&user(raw))
    }

    pub fn fields(descriptor: &LiveSessionDescriptor) -> DescriptorFields {
        let [shell, upload, ipynb] = descriptor.markers().as_array();
        DescriptorFields {
            sessname: Some(descriptor.session_name().as_str().to_string()),
            hostshell: Some(shell.to_string()),
            hostupload: Some(upload.to_string()),
            hostipnb: Some(ipynb.to_string()),
            sign: Some(descriptor.signature().to_string()),
            loading: Some(if descriptor.is_loading() { "1" } else { "0" }.to_string()),
        }
    }

    /// Replace the character at `index` with a different one from the
    /// same alphabet
    pub fn flip_char(s: &str, index: usize) -> String {
        s.char_indices()
            .map(|(i, c)| {
                if i != index {
                    c
                } else if c == 'A' {
                    'B'
                } else {
                    'A'
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod token_tests {
    use super::support::*;
    use crate::application::session_token::SessionTokenCodec;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_derive_session_name_is_stable() {
        for raw in ["alice", "alice@example.com", "Bob.Smith+tag@x.io", "ユーザー"] {
            let first = name_of(raw);
            for _ in 0..5 {
                assert_eq!(name_of(raw), first);
            }
        }
    }

    #[test]
    fn test_issue_then_validate_immediately() {
        let config = config();
        let codec = SessionTokenCodec::new(signer(&config), config.auth_valid_secs);
        for raw in ["alice", "bob@example.com", "x"] {
            let token = codec.issue(&user(raw)).unwrap();
            assert_eq!(codec.parse_and_validate(&token), Some(user(raw)));
        }
    }

    #[test]
    fn test_out_of_range_window_rejects_without_panicking() {
        let config = config();
        let token = SessionTokenCodec::new(signer(&config), config.auth_valid_secs)
            .issue(&user("alice"))
            .unwrap();

        let codec = SessionTokenCodec::new(signer(&config), i64::MAX);
        assert_eq!(codec.parse_and_validate(&token), None);
    }

    #[test]
    fn test_validity_window_edges() {
        let config = config();
        let codec = SessionTokenCodec::new(signer(&config), config.auth_valid_secs);
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let window = Duration::seconds(config.auth_valid_secs);

        let stale = codec
            .issue_at(&user("alice"), now - window - Duration::seconds(1))
            .unwrap();
        let fresh = codec
            .issue_at(&user("alice"), now - window + Duration::seconds(1))
            .unwrap();

        assert_eq!(codec.parse_and_validate_at(&stale, now), None);
        assert_eq!(codec.parse_and_validate_at(&fresh, now), Some(user("alice")));
    }

    #[test]
    fn test_any_single_flip_invalidates_token() {
        let config = config();
        let codec = SessionTokenCodec::new(signer(&config), config.auth_valid_secs);
        let now = Utc::now();
        let token = codec.issue_at(&user("alice"), now).unwrap();

        for index in 0..token.len() {
            let flipped = flip_char(&token, index);
            assert_ne!(flipped, token);
            assert_eq!(
                codec.parse_and_validate_at(&flipped, now),
                None,
                "flip at {index} accepted"
            );
        }
    }
}

#[cfg(test)]
mod live_session_tests {
    use std::sync::Arc;

    use super::support::*;
    use crate::application::check_session::{CheckLiveSessionUseCase, LiveSession};
    use crate::domain::cluster::JobDispatcher;
    use crate::domain::entity::container::{ContainerRecord, ContainerStatus};
    use crate::domain::entity::live_session::LiveSessionDescriptor;
    use crate::domain::value_object::endpoint_markers::EndpointMarkers;
    use crate::error::SessionError;
    use crate::infra::memory::InMemoryCluster;

    async fn running_alice(cluster: &InMemoryCluster) -> ContainerRecord {
        let record = ContainerRecord::new(
            name_of("alice"),
            "res-alice",
            ContainerStatus::Running,
            EndpointMarkers::new("8022", "8023", "8024"),
        );
        cluster.insert(record.clone()).await;
        record
    }

    #[tokio::test]
    async fn test_valid_descriptor() {
        let config = config();
        let cluster = InMemoryCluster::new();
        let record = running_alice(&cluster).await;
        let descriptor = LiveSessionDescriptor::ready_for(&record, &signer(&config));

        let use_case = CheckLiveSessionUseCase::new(Arc::new(cluster), signer(&config));
        assert!(use_case.is_valid(&fields(&descriptor)).await);
    }

    #[tokio::test]
    async fn test_any_single_flip_of_signature_invalidates() {
        let config = config();
        let cluster = InMemoryCluster::new();
        let record = running_alice(&cluster).await;
        let descriptor = LiveSessionDescriptor::ready_for(&record, &signer(&config));
        let use_case = CheckLiveSessionUseCase::new(Arc::new(cluster), signer(&config));

        for index in 0..descriptor.signature().len() {
            let mut tampered = fields(&descriptor);
            tampered.sign = Some(flip_char(descriptor.signature(), index));
            assert!(!use_case.is_valid(&tampered).await, "flip at {index} accepted");
        }
    }

    #[tokio::test]
    async fn test_deleted_container_or_moved_ports() {
        let config = config();
        let cluster = InMemoryCluster::new();
        let record = running_alice(&cluster).await;
        let stale = LiveSessionDescriptor::build(
            record.name.clone(),
            EndpointMarkers::new("9000", "9001", "9002"),
            false,
            &signer(&config),
        );
        let use_case = CheckLiveSessionUseCase::new(Arc::new(cluster.clone()), signer(&config));

        tokio_test::assert_err!(use_case.validate(&fields(&stale)).await);

        let current = LiveSessionDescriptor::ready_for(&record, &signer(&config));
        cluster.backup_and_cleanup(record.resource_id()).await.unwrap();
        assert!(matches!(
            use_case.validate(&fields(&current)).await,
            Err(SessionError::RegistryMismatch)
        ));
    }

    #[tokio::test]
    async fn test_exited_container_invalidates_descriptor() {
        let config = config();
        let cluster = InMemoryCluster::new();
        let record = running_alice(&cluster).await;
        let ready = LiveSessionDescriptor::ready_for(&record, &signer(&config));
        let use_case = CheckLiveSessionUseCase::new(Arc::new(cluster.clone()), signer(&config));
        assert!(use_case.is_valid(&fields(&ready)).await);

        cluster.stop(&record.name).await;
        assert!(!use_case.is_valid(&fields(&ready)).await);
        assert!(matches!(
            use_case.validate(&fields(&ready)).await,
            Err(SessionError::RegistryMismatch)
        ));
    }

    #[tokio::test]
    async fn test_launch_that_died_is_not_pending() {
        let config = config();
        let cluster = InMemoryCluster::new();
        let name = name_of("alice");
        cluster.launch(&name, &user("alice"), true).await.unwrap();
        cluster.stop(&name).await;

        let loading = LiveSessionDescriptor::loading(name, &signer(&config));
        let use_case = CheckLiveSessionUseCase::new(Arc::new(cluster), signer(&config));
        assert!(!use_case.is_valid(&fields(&loading)).await);
        assert!(matches!(
            use_case.validate(&fields(&loading)).await,
            Err(SessionError::RegistryMismatch)
        ));
    }

    #[tokio::test]
    async fn test_missing_cookie_is_invalid_not_error() {
        let config = config();
        let cluster = InMemoryCluster::new();
        let record = running_alice(&cluster).await;
        let mut partial = fields(&LiveSessionDescriptor::ready_for(&record, &signer(&config)));
        partial.hostupload = None;

        let use_case = CheckLiveSessionUseCase::new(Arc::new(cluster), signer(&config));
        assert!(!use_case.is_valid(&partial).await);
        assert!(matches!(
            use_case.validate(&partial).await,
            Err(SessionError::MalformedInput(_))
        ));
    }

    #[tokio::test]
    async fn test_pending_and_promoted() {
        let config = config();
        let cluster = InMemoryCluster::new();
        let name = name_of("alice");
        cluster.launch(&name, &user("alice"), true).await.unwrap();

        let loading = LiveSessionDescriptor::loading(name.clone(), &signer(&config));
        let use_case = CheckLiveSessionUseCase::new(Arc::new(cluster.clone()), signer(&config));

        assert!(matches!(
            use_case.validate(&fields(&loading)).await,
            Ok(LiveSession::Pending(_))
        ));

        let record = cluster.complete_launch(&name).await.unwrap();
        match use_case.validate(&fields(&loading)).await {
            Ok(LiveSession::Promoted(ready)) => {
                assert!(!ready.is_loading());
                assert!(ready.matches_record(&record));
                assert!(ready.verify_signature(&signer(&config)).is_ok());
            }
            other => panic!("expected promotion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_owner_mismatch() {
        let config = config();
        let cluster = InMemoryCluster::new();
        let record = running_alice(&cluster).await;
        let descriptor = LiveSessionDescriptor::ready_for(&record, &signer(&config));

        let use_case = CheckLiveSessionUseCase::new(Arc::new(cluster), signer(&config));
        assert!(matches!(
            use_case
                .validate_owned(&fields(&descriptor), &name_of("mallory"))
                .await,
            Err(SessionError::OwnerMismatch)
        ));
    }
}

#[cfg(test)]
mod admission_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::support::*;
    use crate::application::admission::AdmissionController;
    use crate::application::config::SessionConfig;
    use crate::domain::entity::container::{ContainerRecord, ContainerStatus};
    use crate::domain::value_object::{
        admission::AdmissionDecision, endpoint_markers::EndpointMarkers, node_load::NodeLoad,
    };
    use crate::infra::memory::{ClusterCall, InMemoryCluster};

    type Controller =
        AdmissionController<InMemoryCluster, InMemoryCluster, InMemoryCluster, InMemoryCluster>;

    fn controller(cluster: &InMemoryCluster, config: SessionConfig) -> Controller {
        let node_id = config.node().unwrap();
        AdmissionController::new(
            Arc::new(cluster.clone()),
            Arc::new(cluster.clone()),
            Arc::new(cluster.clone()),
            Arc::new(cluster.clone()),
            Arc::new(config),
            node_id,
        )
    }

    async fn insert_alice(cluster: &InMemoryCluster, status: ContainerStatus) -> ContainerRecord {
        let record = ContainerRecord::new(
            name_of("alice"),
            "res-alice",
            status,
            EndpointMarkers::new("8022", "8023", "8024"),
        );
        cluster.insert(record.clone()).await;
        record
    }

    fn launch_of(raw: &str) -> ClusterCall {
        ClusterCall::Launch {
            name: name_of(raw),
            user_id: user(raw),
            force: true,
        }
    }

    #[tokio::test]
    async fn test_max_hop_below_threshold_launches_regardless_of_oracles() {
        let cluster = InMemoryCluster::new();
        insert_alice(&cluster, ContainerStatus::Exited).await;
        cluster.set_load(NodeLoad::new(99)).await;
        cluster.set_accept(false).await;
        cluster.set_leader(false).await;

        let decision = controller(&cluster, config()).decide(&user("alice"), true).await;

        assert_eq!(decision, AdmissionDecision::AllowLaunch);
        assert_eq!(
            cluster.calls().await,
            vec![ClusterCall::Invalidate(name_of("alice")), launch_of("alice")]
        );
    }

    #[tokio::test]
    async fn test_max_hop_at_threshold_falls_through() {
        let cluster = InMemoryCluster::new();
        cluster.set_load(NodeLoad::new(100)).await;
        cluster.set_accept(false).await;

        let decision = controller(&cluster, config()).decide(&user("alice"), true).await;
        assert_eq!(decision, AdmissionDecision::Deny);
        assert_eq!(cluster.launch_count().await, 0);
    }

    #[tokio::test]
    async fn test_max_hop_load_failure_falls_through() {
        let cluster = InMemoryCluster::new();
        cluster.set_load(None).await;

        let decision = controller(&cluster, config()).decide(&user("alice"), true).await;
        assert_eq!(decision, AdmissionDecision::AllowLaunch);
    }

    #[tokio::test]
    async fn test_declined_without_container_issues_nothing() {
        let cluster = InMemoryCluster::new();
        cluster.set_accept(false).await;

        let decision = controller(&cluster, config()).decide(&user("alice"), false).await;

        assert_eq!(decision, AdmissionDecision::Deny);
        assert!(cluster.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_declined_stale_container_is_cleaned_up_once() {
        let cluster = InMemoryCluster::new();
        let record = insert_alice(&cluster, ContainerStatus::Exited).await;
        cluster.set_accept(false).await;

        let decision = controller(&cluster, config()).decide(&user("alice"), false).await;

        assert_eq!(decision, AdmissionDecision::Deny);
        assert_eq!(
            cluster.calls().await,
            vec![
                ClusterCall::Invalidate(name_of("alice")),
                ClusterCall::BackupAndCleanup(record.resource_id().to_string()),
            ]
        );
        assert_eq!(cluster.launch_count().await, 0);
    }

    #[tokio::test]
    async fn test_running_container_is_relaunched_even_when_declined() {
        let cluster = InMemoryCluster::new();
        insert_alice(&cluster, ContainerStatus::Running).await;
        cluster.set_accept(false).await;

        let decision = controller(&cluster, config()).decide(&user("alice"), false).await;

        assert_eq!(decision, AdmissionDecision::AllowLaunch);
        assert_eq!(
            cluster.calls().await,
            vec![ClusterCall::Invalidate(name_of("alice")), launch_of("alice")]
        );
    }

    #[tokio::test]
    async fn test_oracle_timeout_denies() {
        let cluster = InMemoryCluster::new();
        cluster
            .set_oracle_delay(Some(Duration::from_millis(500)))
            .await;
        let config = SessionConfig {
            oracle_timeout: Duration::from_millis(20),
            ..config()
        };

        let decision = controller(&cluster, config).decide(&user("alice"), true).await;

        assert_eq!(decision, AdmissionDecision::Deny);
        assert_eq!(cluster.launch_count().await, 0);
    }

    #[tokio::test]
    async fn test_registry_failure_denies() {
        let cluster = InMemoryCluster::new();
        cluster.set_registry_down(true).await;

        let decision = controller(&cluster, config()).decide(&user("alice"), true).await;

        assert_eq!(decision, AdmissionDecision::Deny);
        assert!(cluster.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_failure_denies() {
        let cluster = InMemoryCluster::new();
        cluster.set_dispatch_down(true).await;

        let decision = controller(&cluster, config()).decide(&user("alice"), false).await;

        assert_eq!(decision, AdmissionDecision::Deny);
        assert_eq!(
            cluster.calls().await,
            vec![ClusterCall::Invalidate(name_of("alice"))]
        );
    }

    #[tokio::test]
    async fn test_concurrent_launches_are_merged() {
        let cluster = InMemoryCluster::new();
        let controller = Arc::new(controller(&cluster, config()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let controller = controller.clone();
            handles.push(tokio::spawn(async move {
                controller.decide(&user("alice"), false).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), AdmissionDecision::AllowLaunch);
        }
        assert_eq!(cluster.launch_count().await, 1);
    }
}

#[cfg(test)]
mod coordinator_tests {
    use chrono::{Duration, Utc};
    use platform::cookie::CookieUpdate;

    use super::support::*;
    use crate::application::coordinator::{RequestInput, SessionStatus};
    use crate::application::session_token::SessionTokenCodec;
    use crate::domain::entity::affinity::{AFFINITY_COOKIE, AffinityMarker};
    use crate::domain::entity::container::{ContainerRecord, ContainerStatus};
    use crate::domain::entity::live_session::LiveSessionDescriptor;
    use crate::domain::value_object::{
        admission::AdmissionDecision, endpoint_markers::EndpointMarkers,
    };
    use crate::infra::memory::{ClusterCall, InMemoryCluster};

    fn identity(config: &crate::SessionConfig, raw: &str) -> String {
        SessionTokenCodec::new(signer(config), config.auth_valid_secs)
            .issue(&user(raw))
            .unwrap()
    }

    fn set_value<'a>(cookies: &'a [CookieUpdate], name: &str) -> Option<&'a str> {
        cookies.iter().rev().find_map(|c| match c {
            CookieUpdate::Set { name: n, value, .. } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    async fn running(cluster: &InMemoryCluster, raw: &str) -> ContainerRecord {
        let record = ContainerRecord::new(
            name_of(raw),
            format!("res-{raw}"),
            ContainerStatus::Running,
            EndpointMarkers::new("8022", "8023", "8024"),
        );
        cluster.insert(record.clone()).await;
        record
    }

    #[tokio::test]
    async fn test_unauthenticated_has_no_side_effects() {
        let config = config();
        let cluster = InMemoryCluster::new();
        let coordinator = coordinator(&cluster, &config);

        let outcome = coordinator.resolve(RequestInput::default()).await;
        assert_eq!(outcome.status, SessionStatus::Unauthenticated);
        assert!(outcome.decision.is_none());
        assert!(outcome.cookies.is_empty());

        let expired = SessionTokenCodec::new(signer(&config), config.auth_valid_secs)
            .issue_at(
                &user("alice"),
                Utc::now() - Duration::seconds(config.auth_valid_secs + 60),
            )
            .unwrap();
        let outcome = coordinator
            .resolve(RequestInput {
                identity: Some(expired),
                ..RequestInput::default()
            })
            .await;
        assert_eq!(outcome.status, SessionStatus::Unauthenticated);
        assert!(cluster.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_alice_forged_descriptor_goes_through_admission() {
        let config = config();
        let cluster = InMemoryCluster::new();
        let record = running(&cluster, "alice").await;
        let codec = SessionTokenCodec::new(signer(&config), config.auth_valid_secs);

        let t0 = Utc::now();
        let token = codec.issue_at(&user("alice"), t0).unwrap();
        assert_eq!(
            codec.parse_and_validate_at(&token, t0 + Duration::seconds(10)),
            Some(user("alice"))
        );

        let genuine = LiveSessionDescriptor::ready_for(&record, &signer(&config));
        let mut forged = fields(&genuine);
        forged.sign = Some(flip_char(genuine.signature(), 3));

        let outcome = coordinator(&cluster, &config)
            .resolve(RequestInput {
                identity: Some(token),
                descriptor: forged,
                ..RequestInput::default()
            })
            .await;

        assert_eq!(outcome.decision, Some(AdmissionDecision::AllowLaunch));
        assert_eq!(outcome.status, SessionStatus::Loading);
        assert_eq!(
            cluster.calls().await,
            vec![
                ClusterCall::Invalidate(name_of("alice")),
                ClusterCall::Launch {
                    name: name_of("alice"),
                    user_id: user("alice"),
                    force: true
                },
            ]
        );
        assert_eq!(set_value(&outcome.cookies, "loading"), Some("1"));
        assert_eq!(set_value(&outcome.cookies, "hostshell"), Some("0"));
    }

    #[tokio::test]
    async fn test_valid_descriptor_is_already_running() {
        let config = config();
        let cluster = InMemoryCluster::new();
        let record = running(&cluster, "alice").await;
        let descriptor = LiveSessionDescriptor::ready_for(&record, &signer(&config));
        let coordinator = coordinator(&cluster, &config);

        let outcome = coordinator
            .resolve(RequestInput {
                identity: Some(identity(&config, "alice")),
                descriptor: fields(&descriptor),
                ..RequestInput::default()
            })
            .await;
        assert_eq!(outcome.status, SessionStatus::Ready);
        assert_eq!(outcome.decision, Some(AdmissionDecision::AlreadyRunning));
        assert!(set_value(&outcome.cookies, AFFINITY_COOKIE).is_some());
        assert!(cluster.calls().await.is_empty());

        // Marker already bound here: nothing to write
        let marker = AffinityMarker::for_node(&config.node().unwrap(), &signer(&config));
        let outcome = coordinator
            .resolve(RequestInput {
                identity: Some(identity(&config, "alice")),
                descriptor: fields(&descriptor),
                affinity: Some(marker.value().to_string()),
                max_hop: false,
            })
            .await;
        assert!(outcome.cookies.is_empty());
    }

    #[tokio::test]
    async fn test_someone_elses_descriptor_is_not_honoured() {
        let config = config();
        let cluster = InMemoryCluster::new();
        let bob = running(&cluster, "bob").await;
        let descriptor = LiveSessionDescriptor::ready_for(&bob, &signer(&config));

        let outcome = coordinator(&cluster, &config)
            .resolve(RequestInput {
                identity: Some(identity(&config, "alice")),
                descriptor: fields(&descriptor),
                ..RequestInput::default()
            })
            .await;

        assert_eq!(outcome.decision, Some(AdmissionDecision::AllowLaunch));
        assert_eq!(outcome.session_name, Some(name_of("alice")));
        assert_eq!(
            set_value(&outcome.cookies, "sessname"),
            Some(name_of("alice").as_str())
        );
    }

    #[tokio::test]
    async fn test_loading_flag_tamper_is_rejected() {
        let config = config();
        let cluster = InMemoryCluster::new();
        let record = running(&cluster, "alice").await;
        let descriptor = LiveSessionDescriptor::ready_for(&record, &signer(&config));
        let mut tampered = fields(&descriptor);
        tampered.loading = Some("1".into());

        let outcome = coordinator(&cluster, &config)
            .resolve(RequestInput {
                identity: Some(identity(&config, "alice")),
                descriptor: tampered,
                ..RequestInput::default()
            })
            .await;
        assert_eq!(outcome.decision, Some(AdmissionDecision::AllowLaunch));
    }

    #[tokio::test]
    async fn test_loading_then_ready() {
        let config = config();
        let cluster = InMemoryCluster::new();
        let coordinator = coordinator(&cluster, &config);
        let token = identity(&config, "alice");

        let first = coordinator
            .resolve(RequestInput {
                identity: Some(token.clone()),
                ..RequestInput::default()
            })
            .await;
        assert_eq!(first.status, SessionStatus::Loading);
        let loading = LiveSessionDescriptor::loading(name_of("alice"), &signer(&config));

        // Still starting: keep waiting, no second launch
        let waiting = coordinator
            .resolve(RequestInput {
                identity: Some(token.clone()),
                descriptor: fields(&loading),
                ..RequestInput::default()
            })
            .await;
        assert_eq!(waiting.status, SessionStatus::Loading);
        assert_eq!(waiting.decision, Some(AdmissionDecision::AlreadyRunning));
        assert_eq!(cluster.launch_count().await, 1);

        let record = cluster.complete_launch(&name_of("alice")).await.unwrap();
        let ready = coordinator
            .resolve(RequestInput {
                identity: Some(token),
                descriptor: fields(&loading),
                ..RequestInput::default()
            })
            .await;
        assert_eq!(ready.status, SessionStatus::Ready);
        assert_eq!(set_value(&ready.cookies, "loading"), Some("0"));
        assert_eq!(
            set_value(&ready.cookies, "hostshell"),
            Some(record.markers.shell.as_str())
        );
    }

    #[tokio::test]
    async fn test_exited_container_is_relaunched() {
        let config = config();
        let cluster = InMemoryCluster::new();
        let record = running(&cluster, "alice").await;
        let descriptor = LiveSessionDescriptor::ready_for(&record, &signer(&config));
        cluster.stop(&record.name).await;

        let outcome = coordinator(&cluster, &config)
            .resolve(RequestInput {
                identity: Some(identity(&config, "alice")),
                descriptor: fields(&descriptor),
                ..RequestInput::default()
            })
            .await;

        assert_eq!(outcome.status, SessionStatus::Loading);
        assert_eq!(outcome.decision, Some(AdmissionDecision::AllowLaunch));
        assert_eq!(
            cluster.calls().await,
            vec![
                ClusterCall::Invalidate(name_of("alice")),
                ClusterCall::Launch {
                    name: name_of("alice"),
                    user_id: user("alice"),
                    force: true
                },
            ]
        );
        assert_eq!(set_value(&outcome.cookies, "loading"), Some("1"));
    }

    #[tokio::test]
    async fn test_dead_launch_stops_polling_and_relaunches() {
        let config = config();
        let cluster = InMemoryCluster::new();
        let coordinator = coordinator(&cluster, &config);
        let token = identity(&config, "alice");

        coordinator
            .resolve(RequestInput {
                identity: Some(token.clone()),
                ..RequestInput::default()
            })
            .await;
        cluster.stop(&name_of("alice")).await;

        let loading = LiveSessionDescriptor::loading(name_of("alice"), &signer(&config));
        let outcome = coordinator
            .resolve(RequestInput {
                identity: Some(token),
                descriptor: fields(&loading),
                ..RequestInput::default()
            })
            .await;

        assert_eq!(outcome.status, SessionStatus::Loading);
        assert_eq!(outcome.decision, Some(AdmissionDecision::AllowLaunch));
        assert_eq!(cluster.launch_count().await, 2);
    }

    #[tokio::test]
    async fn test_exited_container_is_cleaned_up_when_declined() {
        let config = config();
        let cluster = InMemoryCluster::new();
        let record = running(&cluster, "alice").await;
        let descriptor = LiveSessionDescriptor::ready_for(&record, &signer(&config));
        cluster.stop(&record.name).await;
        cluster.set_accept(false).await;

        let outcome = coordinator(&cluster, &config)
            .resolve(RequestInput {
                identity: Some(identity(&config, "alice")),
                descriptor: fields(&descriptor),
                ..RequestInput::default()
            })
            .await;

        assert_eq!(outcome.status, SessionStatus::Retry);
        assert_eq!(outcome.decision, Some(AdmissionDecision::Deny));
        assert!(
            cluster
                .calls()
                .await
                .contains(&ClusterCall::BackupAndCleanup("res-alice".to_string()))
        );
        assert!(cluster.record(&name_of("alice")).await.is_none());
    }

    #[tokio::test]
    async fn test_deny_clears_everything_and_closes() {
        let config = config();
        let cluster = InMemoryCluster::new();
        cluster.set_accept(false).await;

        let outcome = coordinator(&cluster, &config)
            .resolve(RequestInput {
                identity: Some(identity(&config, "alice")),
                ..RequestInput::default()
            })
            .await;

        assert_eq!(outcome.status, SessionStatus::Retry);
        assert!(outcome.close_connection);
        let cleared: Vec<&str> = outcome
            .cookies
            .iter()
            .filter(|c| c.is_clear())
            .map(|c| c.name())
            .collect();
        let expected = [
            "sessname",
            "hostshell",
            "hostupload",
            "hostipnb",
            "sign",
            "loading",
            "lb",
            "AWSELB",
        ];
        for name in expected {
            assert!(cleared.contains(&name), "{name} not cleared");
        }
        assert!(outcome.cookies.iter().all(|c| c.is_clear()));
    }
}

#[cfg(test)]
mod router_tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::routing::get;
    use tower::ServiceExt;

    use super::support::*;
    use crate::application::config::SessionConfig;
    use crate::application::session_token::SessionTokenCodec;
    use crate::infra::memory::InMemoryCluster;
    use crate::presentation::plugin::{HandlerPlugin, PluginRegistry, UiModulePlugin};
    use crate::presentation::router::session_router;

    struct StatsPlugin;

    impl HandlerPlugin for StatsPlugin {
        fn name(&self) -> &str {
            "stats"
        }

        fn get_uri(&self) -> Option<&str> {
            Some("/stats")
        }

        fn router(&self) -> Router {
            Router::new().route("/", get(|| async { "stats" }))
        }

        fn get_js(&self) -> Option<&str> {
            Some("/assets/stats.js")
        }
    }

    struct ConfigSection;

    impl UiModulePlugin for ConfigSection {
        fn name(&self) -> &str {
            "config"
        }

        fn get_template(&self) -> &str {
            "config_section.tpl"
        }
    }

    fn plugins() -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        registry.register_handler(Arc::new(StatsPlugin)).unwrap();
        registry.register_ui_module(Arc::new(ConfigSection)).unwrap();
        registry
    }

    fn app(cluster: &InMemoryCluster, config: &SessionConfig) -> Router {
        session_router(cluster.clone(), config.clone(), &plugins()).unwrap()
    }

    /// Turn a response's Set-Cookie headers into a request Cookie header
    fn cookie_jar(
        response: &axum::response::Response,
        mut jar: Vec<(String, String)>,
    ) -> Vec<(String, String)> {
        for value in response.headers().get_all(header::SET_COOKIE) {
            let raw = value.to_str().unwrap();
            let pair = raw.split(';').next().unwrap();
            let (name, value) = pair.split_once('=').unwrap();
            jar.retain(|(n, _)| n != name);
            if !raw.contains("Max-Age=0") {
                jar.push((name.to_string(), value.to_string()));
            }
        }
        jar
    }

    fn cookie_header(jar: &[(String, String)]) -> String {
        jar.iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn get_with(uri: &str, jar: &[(String, String)]) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::COOKIE, cookie_header(jar))
            .body(Body::empty())
            .unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn signed_in_jar(config: &SessionConfig, raw: &str) -> Vec<(String, String)> {
        let token = SessionTokenCodec::new(signer(config), config.auth_valid_secs)
            .issue(&user(raw))
            .unwrap();
        vec![(config.identity_cookie_name.clone(), token)]
    }

    #[test]
    fn test_router_requires_secret() {
        let config = SessionConfig::default();
        assert!(session_router(InMemoryCluster::new(), config, &PluginRegistry::new()).is_err());
    }

    #[test]
    fn test_router_rejects_out_of_range_window() {
        let config = SessionConfig {
            auth_valid_secs: i64::MAX,
            ..config()
        };
        assert!(session_router(InMemoryCluster::new(), config, &PluginRegistry::new()).is_err());
    }

    #[tokio::test]
    async fn test_session_requires_identity() {
        let config = config();
        let cluster = InMemoryCluster::with_auto_start();

        let response = app(&cluster, &config)
            .oneshot(get_with("/session", &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json(response).await["status"], "unauthenticated");
    }

    #[tokio::test]
    async fn test_sign_in_then_launch_then_ready() {
        let config = config();
        let cluster = InMemoryCluster::with_auto_start();
        let app = app(&cluster, &config);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/signin")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"userId":"alice@example.com"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let jar = cookie_jar(&response, Vec::new());
        assert!(jar.iter().any(|(n, _)| n == "session_auth"));

        let response = app.clone().oneshot(get_with("/session", &jar)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let jar = cookie_jar(&response, jar);
        let body = json(response).await;
        assert_eq!(body["status"], "loading");
        assert_eq!(body["loading"], true);

        let response = app.clone().oneshot(get_with("/session", &jar)).await.unwrap();
        let jar = cookie_jar(&response, jar);
        assert_eq!(json(response).await["status"], "ready");
        assert!(jar.iter().any(|(n, v)| n == "loading" && v == "0"));

        let response = app.clone().oneshot(get_with("/stats", &jar)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_plugin_routes_are_guarded() {
        let config = config();
        let cluster = InMemoryCluster::with_auto_start();

        let response = app(&cluster, &config)
            .oneshot(get_with("/stats", &signed_in_jar(&config, "alice")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["X-Session-Required"], "true");
    }

    #[tokio::test]
    async fn test_deny_closes_connection() {
        let config = config();
        let cluster = InMemoryCluster::new();
        cluster.set_accept(false).await;

        let response = app(&cluster, &config)
            .oneshot(get_with("/session", &signed_in_jar(&config, "alice")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONNECTION], "close");
        let cleared: Vec<&str> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .filter(|v| v.contains("Max-Age=0"))
            .collect();
        assert!(cleared.iter().any(|c| c.starts_with("lb=")));
        assert!(cleared.iter().any(|c| c.starts_with("AWSELB=")));
        assert_eq!(json(response).await["status"], "retry");
    }

    #[tokio::test]
    async fn test_sign_in_disabled_outside_development() {
        let config = SessionConfig {
            dev_sign_in: false,
            ..config()
        };
        let response = app(&InMemoryCluster::new(), &config)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/signin")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"userId":"alice"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sign_out_cleans_up_container() {
        let config = config();
        let cluster = InMemoryCluster::with_auto_start();
        let app = app(&cluster, &config);
        let jar = signed_in_jar(&config, "alice");

        let response = app.clone().oneshot(get_with("/session", &jar)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(cluster.record(&name_of("alice")).await.is_some());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/signout")
                    .header(header::COOKIE, cookie_header(&jar))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(cluster.record(&name_of("alice")).await.is_none());
        assert!(response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .any(|v| v.to_str().unwrap().starts_with("session_auth=;")));
    }

    #[tokio::test]
    async fn test_plugin_manifest() {
        let config = config();
        let response = app(&InMemoryCluster::new(), &config)
            .oneshot(get_with("/plugins/manifest", &[]))
            .await
            .unwrap();
        let body = json(response).await;
        assert_eq!(body["javascripts"][0], "/assets/stats.js");
        assert_eq!(body["uiTemplates"][0], "config_section.tpl");
    }
}
