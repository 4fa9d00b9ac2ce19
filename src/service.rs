//! Service assembly: wire config, stores, classifier, notifier, and the
//! handler registry into a running dispatcher.

use std::sync::Arc;

use crate::classifier::Classifier;
use crate::config::Config;
use crate::dispatch::{
    Dispatcher, DomainEvent, HandlerRegistry, PublishError, TICKET_CREATED, USER_SIGNUP,
};
use crate::event_bus::EventBus;
use crate::model::{TicketId, UserId};
use crate::notifier::Notifier;
use crate::store::{TicketStore, UserStore};
use crate::workflow::{
    SignupWorkflow, TicketCreatedHandler, TriageWorkflow, UserSignupHandler,
};

/// A running triage service: event bus listener plus dispatcher.
///
/// Constructed via [`Service::start`]; publish events through it and call
/// [`Service::shutdown`] to drain in-flight runs.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use ticketflow::classifier::HttpClassifier;
/// use ticketflow::config::Config;
/// use ticketflow::event_bus::EventBus;
/// use ticketflow::notifier::HttpNotifier;
/// use ticketflow::service::Service;
/// use ticketflow::store::MemoryStore;
///
/// # async fn example() {
/// let config = Config::from_env();
/// let store = Arc::new(MemoryStore::new());
/// let classifier = Arc::new(HttpClassifier::new(config.classifier.clone()));
/// let notifier = Arc::new(HttpNotifier::new(config.mailer.clone()));
///
/// let service = Service::start(
///     config,
///     store.clone(),
///     store,
///     classifier,
///     notifier,
///     EventBus::default(),
/// );
/// # let ticket_id = ticketflow::model::TicketId::new();
/// service.publish_ticket_created(ticket_id).unwrap();
/// service.shutdown().await;
/// # }
/// ```
pub struct Service {
    dispatcher: Dispatcher,
    event_bus: EventBus,
}

impl Service {
    /// Build the handler registry, start the bus listener and dispatcher,
    /// and return the running service.
    pub fn start(
        config: Config,
        tickets: Arc<dyn TicketStore>,
        users: Arc<dyn UserStore>,
        classifier: Arc<dyn Classifier>,
        notifier: Arc<dyn Notifier>,
        event_bus: EventBus,
    ) -> Self {
        event_bus.listen_for_events();
        let events = event_bus.get_sender();

        let triage = Arc::new(TriageWorkflow::new(
            tickets,
            users.clone(),
            classifier,
            notifier.clone(),
            config.retry.clone(),
            events.clone(),
        ));
        let signup = Arc::new(SignupWorkflow::new(
            users,
            notifier,
            config.retry,
            events.clone(),
        ));

        let registry = HandlerRegistry::new()
            .register(TICKET_CREATED, Arc::new(TicketCreatedHandler::new(triage)))
            .register(USER_SIGNUP, Arc::new(UserSignupHandler::new(signup)));

        let dispatcher = Dispatcher::new(registry, events, config.redelivery);
        dispatcher.start();

        Self {
            dispatcher,
            event_bus,
        }
    }

    /// Publish an arbitrary domain event.
    pub fn publish(&self, event: DomainEvent) -> Result<(), PublishError> {
        self.dispatcher.publish(event)
    }

    /// Publish `ticket.created` for the given ticket.
    pub fn publish_ticket_created(&self, ticket_id: TicketId) -> Result<(), PublishError> {
        self.publish(DomainEvent::ticket_created(ticket_id))
    }

    /// Publish `user.signup` for the given user.
    pub fn publish_user_signup(&self, user_id: UserId) -> Result<(), PublishError> {
        self.publish(DomainEvent::user_signup(user_id))
    }

    /// Stop the dispatcher (draining in-flight runs) and the bus listener.
    pub async fn shutdown(self) {
        self.dispatcher.stop().await;
        self.event_bus.stop_listener().await;
    }
}
