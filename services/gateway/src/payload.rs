//! Wire payload assembly.
//!
//! Every Server Post encoding carries the same field set; only the
//! container differs. The HTTPS channel sends a form body, the socket
//! channel a document whose root element names the transaction by its wire
//! code, and BRIC storage the fixed `<DETAIL>` body. Field names are part
//! of the external contract and are written with exact casing.

use chrono::{DateTime, Local};
use epx_wire::{FormBuilder, RequestWriter};

use crate::identity::MerchantIdentity;
use crate::request::{TranType, TransactionRequest};

/// `BATCH_ID`: the local calendar date, `YYYYMMDD`.
pub fn batch_id(now: DateTime<Local>) -> String {
    now.format("%Y%m%d").to_string()
}

/// `LOCAL_DATE`: the local calendar date, `MMDDYY`.
pub fn local_date(now: DateTime<Local>) -> String {
    now.format("%m%d%y").to_string()
}

/// `LOCAL_TIME`: the local wall-clock time, `HHMMSS`.
pub fn local_time(now: DateTime<Local>) -> String {
    now.format("%H%M%S").to_string()
}

/// Stage the form body for a Server Post HTTPS transaction.
pub fn build_financial_form(
    identity: &MerchantIdentity,
    request: &TransactionRequest,
    kind: TranType,
    now: DateTime<Local>,
    form: &mut FormBuilder,
) {
    form.field("CUST_NBR", &identity.cust_nbr)
        .field("MERCH_NBR", &identity.merch_nbr)
        .field("DBA_NBR", &identity.dba_nbr)
        .field("TERMINAL_NBR", &identity.terminal_nbr)
        .field("TRAN_TYPE", kind.wire_code())
        .field("AMOUNT", &request.amount)
        .field("TRAN_NBR", &request.tran_nbr)
        .field("BATCH_ID", &batch_id(now))
        .field("LOCAL_DATE", &local_date(now))
        .field("LOCAL_TIME", &local_time(now));

    form.optional_field("TRAN_GROUP", request.tran_group.as_deref())
        .optional_field("ORIG_AUTH_GUID", request.original_auth_guid.as_deref())
        .optional_field("ACCOUNT_NBR", request.account_nbr.as_deref())
        .optional_field("EXP_DATE", request.exp_date.as_deref())
        .optional_field("CVV2", request.cvv2.as_deref())
        .optional_field("CARD_ENT_METH", request.card_ent_meth.as_deref())
        .optional_field("INDUSTRY_TYPE", request.industry_type.as_deref())
        .optional_field("FIRST_NAME", request.first_name.as_deref())
        .optional_field("LAST_NAME", request.last_name.as_deref())
        .optional_field("ADDRESS", request.address.as_deref())
        .optional_field("CITY", request.city.as_deref())
        .optional_field("STATE", request.state.as_deref())
        .optional_field("ZIP_CODE", request.zip_code.as_deref())
        .optional_field("ROUTING_NBR", request.routing_nbr.as_deref())
        .optional_field("STD_ENTRY_CLASS", request.std_entry_class.as_deref())
        .optional_field("RECV_NAME", request.recv_name.as_deref())
        .optional_field("ACI_EXT", request.aci_ext.as_deref());
}

/// Stage the transaction-rooted document for the XML socket channel.
///
/// The root element names the transaction by its wire code and carries the
/// merchant identity as attributes; the children are the same field set as
/// the form body.
pub fn build_socket_xml(
    identity: &MerchantIdentity,
    request: &TransactionRequest,
    kind: TranType,
    now: DateTime<Local>,
    writer: &mut RequestWriter,
) {
    writer.open_root(
        kind.wire_code(),
        &identity.cust_nbr,
        &identity.merch_nbr,
        &identity.dba_nbr,
        &identity.terminal_nbr,
    );
    write_transaction_elements(request, kind, now, writer);
}

/// Stage the `<DETAIL>` document for the BRIC storage operations.
pub fn build_detail_xml(
    identity: &MerchantIdentity,
    request: &TransactionRequest,
    kind: TranType,
    now: DateTime<Local>,
    writer: &mut RequestWriter,
) {
    writer.open_detail(
        &identity.cust_nbr,
        &identity.merch_nbr,
        &identity.dba_nbr,
        &identity.terminal_nbr,
    );
    write_transaction_elements(request, kind, now, writer);
}

fn write_transaction_elements(
    request: &TransactionRequest,
    kind: TranType,
    now: DateTime<Local>,
    writer: &mut RequestWriter,
) {
    writer
        .element("TRAN_TYPE", kind.wire_code())
        .element("BATCH_ID", &batch_id(now))
        .element("TRAN_NBR", &request.tran_nbr)
        .element("LOCAL_DATE", &local_date(now))
        .element("LOCAL_TIME", &local_time(now));
    if !request.amount.is_empty() {
        writer.element("AMOUNT", &request.amount);
    }
    writer
        .optional_element("TRAN_GROUP", request.tran_group.as_deref())
        .optional_element("ORIG_AUTH_GUID", request.original_auth_guid.as_deref())
        .optional_element("ACCOUNT_NBR", request.account_nbr.as_deref())
        .optional_element("EXP_DATE", request.exp_date.as_deref())
        .optional_element("CVV2", request.cvv2.as_deref())
        .optional_element("CARD_ENT_METH", request.card_ent_meth.as_deref())
        .optional_element("INDUSTRY_TYPE", request.industry_type.as_deref())
        .optional_element("FIRST_NAME", request.first_name.as_deref())
        .optional_element("LAST_NAME", request.last_name.as_deref())
        .optional_element("ADDRESS", request.address.as_deref())
        .optional_element("CITY", request.city.as_deref())
        .optional_element("STATE", request.state.as_deref())
        .optional_element("ZIP_CODE", request.zip_code.as_deref())
        .optional_element("ROUTING_NBR", request.routing_nbr.as_deref())
        .optional_element("STD_ENTRY_CLASS", request.std_entry_class.as_deref())
        .optional_element("RECV_NAME", request.recv_name.as_deref())
        .optional_element("ACI_EXT", request.aci_ext.as_deref());
}
