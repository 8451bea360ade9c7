use crate::{Effect, Msg, Session};

/// Pure update function: applies a message to a session and returns any effects.
pub fn update(mut session: Session, msg: Msg) -> (Session, Vec<Effect>) {
    let effects = match msg {
        Msg::QuerySubmitted(raw) => {
            let query = raw.trim();
            if query.is_empty() {
                return (session, Vec::new());
            }
            session.set_query(query);
            Vec::new()
        }
        Msg::RefillCheck => refill(&mut session),
        Msg::FetchCompleted(completion) => {
            session.on_fetch_complete(completion);
            Vec::new()
        }
        Msg::BlockRequested => {
            let outcome = session.take_block();
            let mut effects = vec![Effect::Present(outcome)];
            effects.extend(refill(&mut session));
            effects
        }
    };

    (session, effects)
}

fn refill(session: &mut Session) -> Vec<Effect> {
    session
        .ensure_refill()
        .map(Effect::StartFetch)
        .into_iter()
        .collect()
}
