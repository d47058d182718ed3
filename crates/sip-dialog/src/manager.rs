//! The dialog registry (spec §4.E, §5 "registry keyed by opaque ...
//! struct keys").

use std::sync::Arc;

use dashmap::DashMap;
use sip_types::dialog_id::DialogKey;
use sip_types::message::{Request, Response};
use sip_transaction::TransactionKey;
use tokio::sync::Mutex;
use tracing::debug;

use crate::dialog::{key_for_incoming_request, Dialog};
use crate::error::{Error, Result};

/// Owns every live dialog. One instance per `UserAgent`, the way the
/// transaction layer owns one `TransactionManager` (spec §5).
pub struct DialogManager {
    dialogs: DashMap<DialogKey, Mutex<Dialog>>,
}

impl DialogManager {
    pub fn new() -> Arc<Self> {
        Arc::new(DialogManager { dialogs: DashMap::new() })
    }

    pub async fn create_from_uac_response(&self, invite: &Request, response: &Response, invite_transaction: Option<TransactionKey>) -> Result<DialogKey> {
        let dialog = Dialog::from_uac_response(invite, response, invite_transaction)?;
        let key = dialog.key.clone();
        debug!(%key, "registering dialog (UAC)");
        self.dialogs.insert(key.clone(), Mutex::new(dialog));
        Ok(key)
    }

    pub async fn create_from_uas_response(&self, invite: &Request, response: &Response, invite_transaction: Option<TransactionKey>) -> Result<DialogKey> {
        let dialog = Dialog::from_uas_response(invite, response, invite_transaction)?;
        let key = dialog.key.clone();
        debug!(%key, "registering dialog (UAS)");
        self.dialogs.insert(key.clone(), Mutex::new(dialog));
        Ok(key)
    }

    /// Promotes an early dialog to confirmed when the 2xx finally lands
    /// (the first dialog-establishing response may have been a 1xx).
    pub async fn confirm(&self, key: &DialogKey) -> Result<()> {
        let slot = self.lookup(key)?;
        slot.lock().await.confirm();
        Ok(())
    }

    pub async fn get(&self, key: &DialogKey) -> Result<Dialog> {
        let slot = self.lookup(key)?;
        let dialog = slot.lock().await.clone();
        Ok(dialog)
    }

    pub fn remove(&self, key: &DialogKey) {
        self.dialogs.remove(key);
    }

    /// Spec §4.E in-dialog request processing: finds the owning dialog by
    /// `(call-id, to-tag, from-tag)`, applies the CSeq ordering check, and
    /// moves the dialog to `Terminated` on BYE.
    pub async fn handle_incoming_request(&self, request: &Request) -> Result<DialogKey> {
        let key = key_for_incoming_request(request).ok_or(Error::MissingHeader("To;tag or From;tag"))?;
        let slot = self.lookup(&key)?;
        let mut dialog = slot.lock().await;
        dialog.process_incoming_request(request)?;
        Ok(key)
    }

    async fn apply<F, R>(&self, key: &DialogKey, f: F) -> Result<R>
    where
        F: FnOnce(&mut Dialog) -> R,
    {
        let slot = self.lookup(key)?;
        let mut dialog = slot.lock().await;
        Ok(f(&mut dialog))
    }

    /// Builds the next in-dialog request and applies its local-seq bump in
    /// one step, so callers can't observe a dialog with an incremented
    /// sequence number but no corresponding request in flight.
    pub async fn build_request(&self, key: &DialogKey, method: sip_types::method::Method, via: sip_types::via::Via, max_forwards: u8) -> Result<Request> {
        self.apply(key, |dialog| dialog.build_request(method, via, max_forwards)).await
    }

    pub async fn build_ack(&self, key: &DialogKey, invite_seq: u32, via: sip_types::via::Via) -> Result<Request> {
        self.apply(key, |dialog| dialog.build_ack(invite_seq, via)).await
    }

    fn lookup(&self, key: &DialogKey) -> Result<dashmap::mapref::one::Ref<'_, DialogKey, Mutex<Dialog>>> {
        self.dialogs.get(key).ok_or_else(|| Error::NoSuchDialog {
            call_id: key.call_id.clone(),
            local_tag: key.local_tag.clone(),
            remote_tag: key.remote_tag.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sip_types::header::{Header, HeaderMap};
    use sip_types::headers::{CSeq, NamedAddress};
    use sip_types::message::reply;
    use sip_types::method::Method;
    use sip_types::param::Param;
    use sip_types::status::StatusCode;
    use sip_types::uri::{Host, Uri};
    use sip_types::via::Via;

    fn sample_invite() -> Request {
        let mut headers = HeaderMap::new();
        headers.push(Header::Via(Via::new("UDP", Host::Hostname("pc33.atlanta.com".into()), Some(5060), vec![Param::branch("z9hG4bK1")])));
        headers.push(Header::From(NamedAddress::new(None, Uri::sip("atlanta.com")).with_tag("alice-tag")));
        headers.push(Header::To(NamedAddress::new(None, Uri::sip("biloxi.com"))));
        headers.push(Header::CallId("call-1".into()));
        headers.push(Header::CSeq(CSeq { seq: 1, method: Method::Invite }));
        headers.push(Header::Contact(NamedAddress::new(None, Uri::sip("pc33.atlanta.com"))));
        Request::new(Method::Invite, Uri::sip("biloxi.com"), headers)
    }

    #[tokio::test]
    async fn create_then_build_in_dialog_bye() {
        let manager = DialogManager::new();
        let invite = sample_invite();
        let mut ok = reply(&invite, StatusCode::OK, Some("bob-tag"));
        ok.headers.push(Header::Contact(NamedAddress::new(None, Uri::sip("biloxi.com"))));
        let key = manager.create_from_uac_response(&invite, &ok, None).await.unwrap();

        let via = Via::new("UDP", Host::Hostname("pc33.atlanta.com".into()), Some(5060), vec![]);
        let bye = manager.build_request(&key, Method::Bye, via, 70).await.unwrap();
        assert_eq!(bye.method, Method::Bye);
        assert_eq!(bye.cseq().unwrap().seq, 2);

        let dialog = manager.get(&key).await.unwrap();
        assert_eq!(dialog.local_seq, 2);
    }

    #[tokio::test]
    async fn missing_dialog_is_an_error() {
        let manager = DialogManager::new();
        let key = DialogKey::new("no-such-call", "a", "b");
        assert!(manager.get(&key).await.is_err());
    }
}
