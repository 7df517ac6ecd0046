//! HTTP status codes as a typed enum.
//!
//! One table drives everything: the variant, its numeric code and its
//! canonical reason phrase. Use [`Status`] anywhere a status is accepted —
//! [`Response::status`](crate::Response::status), the response builder, an
//! [`HttpError`](crate::HttpError), or as a bare handler return value.

use std::fmt;

macro_rules! statuses {
    ( $( $variant:ident = $code:literal, $reason:literal; )+ ) => {
        /// An IANA-registered HTTP status code.
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        pub enum Status {
            $( $variant, )+
        }

        impl Status {
            /// The numeric wire code, e.g. `404`.
            pub fn code(self) -> u16 {
                match self {
                    $( Self::$variant => $code, )+
                }
            }

            /// The canonical reason phrase, e.g. `"Not Found"`.
            pub fn reason(self) -> &'static str {
                match self {
                    $( Self::$variant => $reason, )+
                }
            }
        }
    };
}

statuses! {
    // 1xx informational
    Continue                      = 100, "Continue";
    SwitchingProtocols            = 101, "Switching Protocols";
    Processing                    = 102, "Processing";
    EarlyHints                    = 103, "Early Hints";
    // 2xx success
    Ok                            = 200, "OK";
    Created                       = 201, "Created";
    Accepted                      = 202, "Accepted";
    NonAuthoritativeInformation   = 203, "Non-Authoritative Information";
    NoContent                     = 204, "No Content";
    ResetContent                  = 205, "Reset Content";
    PartialContent                = 206, "Partial Content";
    MultiStatus                   = 207, "Multi-Status";
    AlreadyReported               = 208, "Already Reported";
    ImUsed                        = 226, "IM Used";
    // 3xx redirection
    MultipleChoices               = 300, "Multiple Choices";
    MovedPermanently              = 301, "Moved Permanently";
    Found                         = 302, "Found";
    SeeOther                      = 303, "See Other";
    NotModified                   = 304, "Not Modified";
    TemporaryRedirect             = 307, "Temporary Redirect";
    PermanentRedirect             = 308, "Permanent Redirect";
    // 4xx client errors
    BadRequest                    = 400, "Bad Request";
    Unauthorized                  = 401, "Unauthorized";
    PaymentRequired               = 402, "Payment Required";
    Forbidden                     = 403, "Forbidden";
    NotFound                      = 404, "Not Found";
    MethodNotAllowed              = 405, "Method Not Allowed";
    NotAcceptable                 = 406, "Not Acceptable";
    ProxyAuthenticationRequired   = 407, "Proxy Authentication Required";
    RequestTimeout                = 408, "Request Timeout";
    Conflict                      = 409, "Conflict";
    Gone                          = 410, "Gone";
    LengthRequired                = 411, "Length Required";
    PreconditionFailed            = 412, "Precondition Failed";
    ContentTooLarge               = 413, "Content Too Large";
    UriTooLong                    = 414, "URI Too Long";
    UnsupportedMediaType          = 415, "Unsupported Media Type";
    RangeNotSatisfiable           = 416, "Range Not Satisfiable";
    ExpectationFailed             = 417, "Expectation Failed";
    ImATeapot                     = 418, "I'm a Teapot";
    MisdirectedRequest            = 421, "Misdirected Request";
    UnprocessableContent          = 422, "Unprocessable Content";
    Locked                        = 423, "Locked";
    FailedDependency              = 424, "Failed Dependency";
    TooEarly                      = 425, "Too Early";
    UpgradeRequired               = 426, "Upgrade Required";
    PreconditionRequired          = 428, "Precondition Required";
    TooManyRequests               = 429, "Too Many Requests";
    RequestHeaderFieldsTooLarge   = 431, "Request Header Fields Too Large";
    UnavailableForLegalReasons    = 451, "Unavailable For Legal Reasons";
    // 5xx server errors
    InternalServerError           = 500, "Internal Server Error";
    NotImplemented                = 501, "Not Implemented";
    BadGateway                    = 502, "Bad Gateway";
    ServiceUnavailable            = 503, "Service Unavailable";
    GatewayTimeout                = 504, "Gateway Timeout";
    HttpVersionNotSupported       = 505, "HTTP Version Not Supported";
    VariantAlsoNegotiates         = 506, "Variant Also Negotiates";
    InsufficientStorage           = 507, "Insufficient Storage";
    LoopDetected                  = 508, "Loop Detected";
    NotExtended                   = 510, "Not Extended";
    NetworkAuthenticationRequired = 511, "Network Authentication Required";
}

impl From<Status> for u16 {
    fn from(status: Status) -> u16 {
        status.code()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_and_reason_agree() {
        assert_eq!(Status::Ok.code(), 200);
        assert_eq!(Status::NotFound.reason(), "Not Found");
        assert_eq!(Status::ImATeapot.to_string(), "418 I'm a Teapot");
        assert_eq!(u16::from(Status::InternalServerError), 500);
    }
}
