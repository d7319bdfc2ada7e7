//! AT-SPI2 `EditableText` backend: inserts text directly into the focused
//! accessible widget over D-Bus. The fastest and least intrusive backend
//! when it's available, since it never touches the clipboard or the
//! synthetic input queue.

#[cfg(feature = "atspi")]
mod real {
    use crate::error::InjectionError;
    use crate::outcome::InjectionOutcome;
    use crate::probe::BackendId;
    use crate::types::InjectionConfig;
    use crate::TextInjector;
    use async_trait::async_trait;
    use std::time::Instant;
    use tracing::{debug, trace, warn};

    pub struct AtspiInjector {
        _config: InjectionConfig,
    }

    impl AtspiInjector {
        pub fn new(config: InjectionConfig) -> Self {
            Self { _config: config }
        }
    }

    #[async_trait]
    impl TextInjector for AtspiInjector {
        fn backend_id(&self) -> BackendId {
            BackendId::Atspi
        }

        async fn is_available(&self) -> bool {
            use atspi::connection::AccessibilityConnection;
            AccessibilityConnection::new().await.is_ok()
        }

        async fn inject_text(&self, text: &str) -> Result<InjectionOutcome, InjectionError> {
            use atspi::{
                connection::AccessibilityConnection, proxy::collection::CollectionProxy,
                proxy::editable_text::EditableTextProxy, proxy::text::TextProxy, Interface,
                MatchType, ObjectMatchRule, SortOrder, State,
            };

            let start = Instant::now();
            trace!("AT-SPI injection starting for {} chars of text", text.len());

            let conn = AccessibilityConnection::new().await.map_err(|e| {
                warn!("AT-SPI connection failed: {}", e);
                InjectionError::Other(format!("AT-SPI connect failed: {e}"))
            })?;
            let zbus_conn = conn.connection();
            trace!("AT-SPI connection established");

            let collection = CollectionProxy::builder(zbus_conn)
                .destination("org.a11y.atspi.Registry")
                .map_err(|e| {
                    InjectionError::Other(format!("CollectionProxy destination failed: {e}"))
                })?
                .path("/org/a11y/atspi/accessible/root")
                .map_err(|e| InjectionError::Other(format!("CollectionProxy path failed: {e}")))?
                .build()
                .await
                .map_err(|e| InjectionError::Other(format!("CollectionProxy build failed: {e}")))?;

            let mut rule = ObjectMatchRule::default();
            rule.states = State::Focused.into();
            rule.states_mt = MatchType::All;
            rule.ifaces = Interface::EditableText.into();
            rule.ifaces_mt = MatchType::All;

            let mut matches = collection
                .get_matches(rule.clone(), SortOrder::Canonical, 1, false)
                .await
                .map_err(|e| {
                    InjectionError::Other(format!("Collection.get_matches failed: {e}"))
                })?;

            if matches.is_empty() {
                debug!("No focused EditableText found, retrying once after 30ms");
                tokio::time::sleep(std::time::Duration::from_millis(30)).await;
                matches = collection
                    .get_matches(rule, SortOrder::Canonical, 1, false)
                    .await
                    .map_err(|e| {
                        InjectionError::Other(format!("Collection.get_matches retry failed: {e}"))
                    })?;
            }

            let Some(obj_ref) = matches.pop() else {
                debug!(
                    "No focused EditableText found after retry ({}ms elapsed)",
                    start.elapsed().as_millis()
                );
                return Err(InjectionError::PreconditionNotMet {
                    reason: "no focused editable text element",
                });
            };

            debug!(
                "Found editable element at path: {:?} in app: {:?}",
                obj_ref.path, obj_ref.name
            );

            let editable = EditableTextProxy::builder(zbus_conn)
                .destination(obj_ref.name.clone())
                .map_err(|e| {
                    InjectionError::Other(format!("EditableTextProxy destination failed: {e}"))
                })?
                .path(obj_ref.path.clone())
                .map_err(|e| InjectionError::Other(format!("EditableTextProxy path failed: {e}")))?
                .build()
                .await
                .map_err(|e| {
                    InjectionError::Other(format!("EditableTextProxy build failed: {e}"))
                })?;

            let text_iface = TextProxy::builder(zbus_conn)
                .destination(obj_ref.name.clone())
                .map_err(|e| InjectionError::Other(format!("TextProxy destination failed: {e}")))?
                .path(obj_ref.path.clone())
                .map_err(|e| InjectionError::Other(format!("TextProxy path failed: {e}")))?
                .build()
                .await
                .map_err(|e| InjectionError::Other(format!("TextProxy build failed: {e}")))?;

            let caret = text_iface.caret_offset().await.map_err(|e| {
                warn!("Failed to get caret offset from {:?}: {}", obj_ref.path, e);
                InjectionError::Other(format!("Text.caret_offset failed: {e}"))
            })?;
            trace!("Current caret position: {}", caret);

            editable
                .insert_text(caret, text, text.chars().count() as i32)
                .await
                .map_err(|e| {
                    warn!(
                        "Failed to insert text at position {} in {:?}: {}",
                        caret, obj_ref.path, e
                    );
                    InjectionError::Other(format!("EditableText.insert_text failed: {e}"))
                })?;

            let elapsed = start.elapsed();
            debug!(
                "Successfully injected {} chars via AT-SPI to {:?} in {}ms",
                text.len(),
                obj_ref.name,
                elapsed.as_millis()
            );

            Ok(InjectionOutcome {
                backend: BackendId::Atspi,
                latency_ms: elapsed.as_millis() as u32,
                degraded: false,
            })
        }
    }
}

// Lightweight stub implementation when the `atspi` feature is disabled. This
// preserves the public type so other modules can compile without cfg
// branches; the stub reports unavailability.
#[cfg(not(feature = "atspi"))]
mod stub {
    use crate::error::InjectionError;
    use crate::outcome::InjectionOutcome;
    use crate::probe::BackendId;
    use crate::types::InjectionConfig;
    use crate::TextInjector;
    use async_trait::async_trait;
    use tracing::warn;

    pub struct AtspiInjector {
        _config: InjectionConfig,
    }

    impl AtspiInjector {
        pub fn new(config: InjectionConfig) -> Self {
            Self { _config: config }
        }
    }

    #[async_trait]
    impl TextInjector for AtspiInjector {
        fn backend_id(&self) -> BackendId {
            BackendId::Atspi
        }

        async fn is_available(&self) -> bool {
            warn!("AT-SPI feature disabled; AtspiInjector stub is not available");
            false
        }

        async fn inject_text(&self, _text: &str) -> Result<InjectionOutcome, InjectionError> {
            Err(InjectionError::Unavailable {
                backend: BackendId::Atspi,
                cause: crate::error::UnavailableCause::Environment {
                    causes: vec!["AT-SPI feature not enabled".to_string()],
                },
            })
        }
    }
}

#[cfg(feature = "atspi")]
pub use real::AtspiInjector;

#[cfg(not(feature = "atspi"))]
pub use stub::AtspiInjector;
