//! Nowon booking site provider.

use std::sync::Arc;

use chrono::NaiveDate;
use courtside_core::{CourtDirectory, Credential, Region, Reservation, ReservationBatch};
use tracing::{debug, info};

use crate::abort::AbortHandle;
use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{
    BookingTokens, BoxFuture, ConfirmedBooking, CourtProvider, FetchMode, MemberInfo,
};
use crate::session::{LoginFlow, SessionManager, SessionState};
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport, form_body};

use super::PROVIDER;
use super::parse::{
    parse_availability, parse_cancel, parse_commit, parse_confirm_page, parse_notify,
};

const LOGIN_FLOW: LoginFlow = LoginFlow {
    login_page: "/member/login.do",
    login_action: "/member/loginProc.do",
    id_field: "userId",
    password_field: "userPw",
    extra_fields: &[("returnUrl", "/rent/main.do")],
    landing: "/mypage/myInfo.do",
    success_marker: "로그아웃",
    failure_markers: &["아이디 또는 비밀번호", "비밀번호가 일치하지", "존재하지 않는 회원"],
};

const AVAILABILITY_PATH: &str = "/rent/timeList.json";
const CONFIRM_PATH: &str = "/rent/confirm.do";
const FINALIZE_PATH: &str = "/rent/save.json";
const NOTIFY_PATH: &str = "/rent/sendSms.json";
const CANCEL_PATH: &str = "/mypage/rentCancel.json";

/// Provider for the Nowon district site.
pub struct NowonProvider {
    transport: Arc<dyn HttpTransport>,
    config: ProviderConfig,
    sessions: SessionManager,
    directory: Arc<CourtDirectory>,
}

impl NowonProvider {
    /// Creates a provider talking to the site over HTTPS.
    pub fn new(config: ProviderConfig, directory: Arc<CourtDirectory>) -> ProviderResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::with_transport(transport, config, directory))
    }

    /// Creates a provider over an arbitrary transport.
    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        config: ProviderConfig,
        directory: Arc<CourtDirectory>,
    ) -> Self {
        let sessions = SessionManager::new(
            Arc::clone(&transport),
            config.clone(),
            LOGIN_FLOW,
            Region::A,
        );
        Self {
            transport,
            config,
            sessions,
            directory,
        }
    }

    fn ajax(request: HttpRequest) -> HttpRequest {
        request.with_header("X-Requested-With", "XMLHttpRequest")
    }

    async fn fetch(
        &self,
        session: &SessionState,
        dates: &[NaiveDate],
    ) -> ProviderResult<Vec<Reservation>> {
        if dates.is_empty() {
            return Ok(Vec::new());
        }

        let pairs: Vec<(&str, String)> = dates
            .iter()
            .map(|d| ("dates", d.format("%Y-%m-%d").to_string()))
            .collect();
        let request = Self::ajax(HttpRequest::post_form(
            self.config.url(AVAILABILITY_PATH),
            form_body(&pairs),
        ));

        debug!(dates = dates.len(), "Fetching batched availability");
        let response = session
            .send(self.transport.as_ref(), "availability", request)
            .await?;

        let mut rows = parse_availability(&response.body, &self.directory)?;
        rows.retain(|r| dates.contains(&r.date));
        debug!(rows = rows.len(), "Parsed availability");
        Ok(rows)
    }

    async fn confirm_batch(
        &self,
        session: &mut SessionState,
        batch: &ReservationBatch,
    ) -> ProviderResult<ConfirmedBooking> {
        let court_code = batch
            .requests()
            .next()
            .map(|r| r.provider_court_code.clone())
            .ok_or_else(|| ProviderError::internal("empty reservation batch"))?;

        let mut pairs = vec![
            ("placeCd", batch.facility_code.clone()),
            ("courtCd", court_code),
            ("useDate", batch.date.format("%Y-%m-%d").to_string()),
        ];
        pairs.extend(batch.requests().map(|r| ("timeList", r.time_label())));

        let request = HttpRequest::post_form(self.config.url(CONFIRM_PATH), form_body(&pairs));
        let response = session
            .send_and_merge(self.transport.as_ref(), "confirm", request)
            .await?;

        parse_confirm_page(&response.body)
    }

    async fn commit(
        &self,
        session: &mut SessionState,
        tokens: &BookingTokens,
    ) -> ProviderResult<String> {
        let body = tokens.form_body();
        let request = Self::ajax(HttpRequest::post_form(self.config.url(FINALIZE_PATH), body));
        let response = session
            .send_and_merge(self.transport.as_ref(), "finalize", request)
            .await?;

        let id = parse_commit(&response.body)?;
        info!(member_id = %session.member_id(), reservation_id = %id, "Booking committed");
        Ok(id)
    }

    async fn send_alert(
        &self,
        session: &mut SessionState,
        tokens: &BookingTokens,
        batch: &ReservationBatch,
        member: &MemberInfo,
        reservation_id: &str,
    ) -> ProviderResult<()> {
        let times = batch
            .requests()
            .map(|r| r.time_label())
            .collect::<Vec<_>>()
            .join(",");
        let pairs = [
            ("rentNo", reservation_id.to_string()),
            ("userNm", member.name.clone().unwrap_or_default()),
            ("userHp", member.phone.clone().unwrap_or_default()),
            ("placeNm", batch.facility_name.clone()),
            ("courtNm", batch.court_label.clone()),
            ("useDate", batch.date.format("%Y-%m-%d").to_string()),
            ("useTime", times),
        ];
        let body = format!("{}&timeStr={}", form_body(&pairs), tokens.time_str.form_value());
        let request = Self::ajax(HttpRequest::post_form(self.config.url(NOTIFY_PATH), body));
        let response = session
            .send_and_merge(self.transport.as_ref(), "notify", request)
            .await?;

        parse_notify(&response.body)
    }

    async fn cancel_rent(
        &self,
        session: &mut SessionState,
        rent_no: &str,
        amount_paid: u64,
    ) -> ProviderResult<()> {
        let pairs = [
            ("rentNo", rent_no.to_string()),
            ("refundAmt", amount_paid.to_string()),
        ];
        let request = Self::ajax(HttpRequest::post_form(self.config.url(CANCEL_PATH), form_body(&pairs)));
        let response = session
            .send_and_merge(self.transport.as_ref(), "cancel", request)
            .await?;

        parse_cancel(&response.body)?;
        info!(member_id = %session.member_id(), rent_no, "Booking cancelled");
        Ok(())
    }
}

impl CourtProvider for NowonProvider {
    fn region(&self) -> Region {
        Region::A
    }

    fn fetch_mode(&self) -> FetchMode {
        FetchMode::Batched
    }

    fn login<'a>(
        &'a self,
        credential: &'a Credential,
        abort: AbortHandle,
    ) -> BoxFuture<'a, ProviderResult<SessionState>> {
        Box::pin(self.sessions.login(credential, abort))
    }

    fn fetch_dates<'a>(
        &'a self,
        session: &'a SessionState,
        dates: &'a [NaiveDate],
    ) -> BoxFuture<'a, ProviderResult<Vec<Reservation>>> {
        Box::pin(async move {
            self.fetch(session, dates)
                .await
                .map_err(|e| e.with_provider(PROVIDER))
        })
    }

    fn confirm<'a>(
        &'a self,
        session: &'a mut SessionState,
        batch: &'a ReservationBatch,
    ) -> BoxFuture<'a, ProviderResult<ConfirmedBooking>> {
        Box::pin(async move {
            self.confirm_batch(session, batch)
                .await
                .map_err(|e| e.with_provider(PROVIDER))
        })
    }

    fn finalize<'a>(
        &'a self,
        session: &'a mut SessionState,
        tokens: &'a BookingTokens,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            self.commit(session, tokens)
                .await
                .map_err(|e| e.with_provider(PROVIDER))
        })
    }

    fn notify<'a>(
        &'a self,
        session: &'a mut SessionState,
        tokens: &'a BookingTokens,
        batch: &'a ReservationBatch,
        member: &'a MemberInfo,
        reservation_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.send_alert(session, tokens, batch, member, reservation_id)
                .await
                .map_err(|e| e.with_provider(PROVIDER))
        })
    }

    fn cancel<'a>(
        &'a self,
        session: &'a mut SessionState,
        rent_no: &'a str,
        amount_paid: u64,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.cancel_rent(session, rent_no, amount_paid)
                .await
                .map_err(|e| e.with_provider(PROVIDER))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::CookieJar;
    use crate::error::ProviderErrorCode;
    use crate::testing::ScriptedTransport;
    use crate::transport::HttpResponse;
    use courtside_core::{BatchSlot, TimeSlotRequest};

    fn provider(transport: Arc<ScriptedTransport>) -> NowonProvider {
        NowonProvider::with_transport(
            transport,
            ProviderConfig::new("https://nowon.test/").unwrap(),
            Arc::new(CourtDirectory::builtin()),
        )
    }

    fn session() -> SessionState {
        let mut jar = CookieJar::new();
        jar.store("JSESSIONID=abc");
        SessionState::new(Region::A, "kim", jar, AbortHandle::new())
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn batch() -> ReservationBatch {
        let request = |start: &str, end: &str| TimeSlotRequest {
            court_id: "bulam-2".into(),
            date: date("2025-05-10"),
            start_time: start.parse().unwrap(),
            end_time: end.parse().unwrap(),
            provider_court_code: "19".into(),
        };
        ReservationBatch {
            region: Region::A,
            court_id: "bulam-2".into(),
            date: date("2025-05-10"),
            facility_code: "BULAM".into(),
            facility_name: "불암산 테니스장".into(),
            court_label: "2번".into(),
            slots: vec![
                BatchSlot { index: 0, request: request("13:00", "14:00") },
                BatchSlot { index: 1, request: request("14:00", "15:00") },
            ],
        }
    }

    #[tokio::test]
    async fn fetch_sends_all_dates_in_one_request() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(HttpResponse::new(
            200,
            r#"{"2025-05-10": [{"placeCd":"BULAM","courtCd":"18","startTm":"06:00","endTm":"08:00","status":"Y"}],
                "2025-05-11": []}"#,
        ));
        let provider = provider(transport.clone());
        let dates = [date("2025-05-10"), date("2025-05-11")];

        let rows = provider.fetch_dates(&session(), &dates).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].court_num, "1번");
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].body.as_deref(),
            Some("dates=2025-05-10&dates=2025-05-11")
        );
        assert_eq!(requests[0].header("Cookie"), Some("JSESSIONID=abc"));
    }

    #[tokio::test]
    async fn tokens_round_trip_byte_for_byte() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(HttpResponse::new(
            200,
            r#"<script>fnSave("voStr=abc&timeStr=13:00~14:00~19~2코트");</script>
               <input type="hidden" name="totalPrice" value="8000">"#,
        ));
        transport.respond(HttpResponse::new(200, r#"{"result": 4521}"#));
        let provider = provider(transport.clone());
        let mut session = session();
        let batch = batch();

        let confirmed = provider.confirm(&mut session, &batch).await.unwrap();
        let id = provider.finalize(&mut session, &confirmed.tokens).await.unwrap();

        assert_eq!(id, "4521");
        assert_eq!(confirmed.price, Some(8000));
        let requests = transport.requests();
        assert_eq!(
            requests[0].body.as_deref(),
            Some("placeCd=BULAM&courtCd=19&useDate=2025-05-10&timeList=13%3A00~14%3A00&timeList=14%3A00~15%3A00")
        );
        assert_eq!(
            requests[1].body.as_deref(),
            Some("voStr=abc&timeStr=13:00~14:00~19~2코트")
        );
    }

    #[tokio::test]
    async fn slot_conflict_keeps_raw_code() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(HttpResponse::new(200, r#"{"result": "-1"}"#));
        let provider = provider(transport);

        let err = provider
            .finalize(&mut session(), &BookingTokens::new("a", "b"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::SlotConflictRejection);
        assert_eq!(err.raw_code(), Some("-1"));
        assert_eq!(err.provider(), Some("nowon"));
    }

    #[tokio::test]
    async fn cancelling_twice_is_a_deterministic_rejection() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(HttpResponse::new(200, r#"{"result": "ok"}"#));
        transport.respond(HttpResponse::new(
            200,
            r#"{"result": "fail", "msg": "이미 취소된 예약입니다."}"#,
        ));
        let provider = provider(transport.clone());
        let mut session = session();

        provider.cancel(&mut session, "4521", 8000).await.unwrap();
        let err = provider.cancel(&mut session, "4521", 8000).await.unwrap_err();

        assert_eq!(err.code(), ProviderErrorCode::CancellationRejected);
        assert_eq!(err.message(), "이미 취소된 예약입니다.");
        assert_eq!(
            transport.requests()[0].body.as_deref(),
            Some("rentNo=4521&refundAmt=8000")
        );
    }

    #[tokio::test]
    async fn notify_posts_member_fields() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(HttpResponse::new(200, r#"{"result": "ok"}"#));
        let provider = provider(transport.clone());
        let member = MemberInfo {
            name: Some("김철수".into()),
            phone: Some("01012345678".into()),
        };

        provider
            .notify(&mut session(), &BookingTokens::new("a", "b"), &batch(), &member, "4521")
            .await
            .unwrap();

        let body = transport.requests()[0].body.clone().unwrap();
        assert!(body.starts_with("rentNo=4521&userNm="));
        assert!(body.contains("userHp=01012345678"));
        assert!(body.ends_with("&timeStr=b"));
    }

    #[tokio::test]
    async fn refused_notify_result_is_an_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(HttpResponse::new(200, r#"{"result": "fail"}"#));
        let provider = provider(transport);

        let err = provider
            .notify(&mut session(), &BookingTokens::new("a", "b"), &batch(), &MemberInfo::default(), "4521")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
        assert_eq!(err.raw_code(), Some("fail"));
    }
}
