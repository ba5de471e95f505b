use serde::Deserialize;

/// Query string of `GET /api/invoices`. Values stay raw strings so that
/// unparsable months or years drop the filter instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceListParams {
    pub month: Option<String>,
    pub year: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    pub month: Option<String>,
    pub year: Option<String>,
}
