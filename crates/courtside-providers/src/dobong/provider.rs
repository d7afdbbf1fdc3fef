//! Dobong booking site provider.

use std::sync::Arc;

use chrono::NaiveDate;
use courtside_core::{CourtDirectory, Credential, Region, Reservation, ReservationBatch};
use tracing::{debug, info};

use crate::abort::AbortHandle;
use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::markup::alert_message;
use crate::provider::{
    BookingTokens, BoxFuture, ConfirmedBooking, CourtProvider, FetchMode, MemberInfo,
};
use crate::session::{LoginFlow, SessionManager, SessionState};
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport, form_body};

use super::PROVIDER;
use super::parse::{parse_cancel, parse_commit, parse_confirm_page, parse_time_table};

const LOGIN_FLOW: LoginFlow = LoginFlow {
    login_page: "/login/loginForm.do",
    login_action: "/login/loginAction.do",
    id_field: "mberId",
    password_field: "mberPw",
    extra_fields: &[],
    landing: "/mypage/reserveList.do",
    success_marker: "로그아웃",
    failure_markers: &["아이디 또는 비밀번호", "회원정보가 일치하지"],
};

const TIME_TABLE_PATH: &str = "/reserve/timeTable.do";
const CONFIRM_PATH: &str = "/reserve/reserveConfirm.do";
const FINALIZE_PATH: &str = "/reserve/reserveSave.do";
const NOTIFY_PATH: &str = "/reserve/sendAlimtalk.do";
const CANCEL_PATH: &str = "/mypage/reserveCancel.do";

/// Provider for the Dobong district site.
pub struct DobongProvider {
    transport: Arc<dyn HttpTransport>,
    config: ProviderConfig,
    sessions: SessionManager,
    directory: Arc<CourtDirectory>,
}

impl DobongProvider {
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
            Region::B,
        );
        Self {
            transport,
            config,
            sessions,
            directory,
        }
    }

    fn time_table_url(&self, facility: &str, date: NaiveDate) -> String {
        format!(
            "{}?facCd={}&useDate={}",
            self.config.url(TIME_TABLE_PATH),
            urlencoding::encode(facility),
            date.format("%Y%m%d")
        )
    }

    /// Fetches every facility's table for the given dates. Any failing page
    /// fails the whole call, so callers pass one date at a time.
    async fn fetch(
        &self,
        session: &SessionState,
        dates: &[NaiveDate],
    ) -> ProviderResult<Vec<Reservation>> {
        let mut rows = Vec::new();
        for &date in dates {
            for facility in self.directory.facilities_in(Region::B) {
                let request = HttpRequest::get(self.time_table_url(&facility.code, date));
                let response = session
                    .send(self.transport.as_ref(), "availability", request)
                    .await?;
                let parsed = parse_time_table(&response.body, &facility.code, date, &self.directory)?;
                debug!(facility = %facility.code, date = %date, rows = parsed.len(), "Parsed time table");
                rows.extend(parsed);
            }
        }
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
            ("facCd", batch.facility_code.clone()),
            ("courtNo", court_code),
            ("useDate", batch.date.format("%Y%m%d").to_string()),
        ];
        pairs.extend(batch.requests().map(|r| ("useTime", r.time_label())));

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
        let request = HttpRequest::post_form(self.config.url(FINALIZE_PATH), tokens.form_body())
            .with_header("X-Requested-With", "XMLHttpRequest");
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
        let pairs = [
            ("rsvNo", reservation_id.to_string()),
            ("rsvNm", member.name.clone().unwrap_or_default()),
            ("rsvTel", member.phone.clone().unwrap_or_default()),
            ("facNm", batch.facility_name.clone()),
            ("courtNm", batch.court_label.clone()),
            ("useDate", batch.date.format("%Y%m%d").to_string()),
        ];
        let body = format!("{}&timeStr={}", form_body(&pairs), tokens.time_str.form_value());
        let request = HttpRequest::post_form(self.config.url(NOTIFY_PATH), body);
        let response = session
            .send_and_merge(self.transport.as_ref(), "notify", request)
            .await?;

        match alert_message(&response.body) {
            Some(alert) => Err(ProviderError::invalid_response(alert)),
            None => Ok(()),
        }
    }

    async fn cancel_rent(
        &self,
        session: &mut SessionState,
        rent_no: &str,
        amount_paid: u64,
    ) -> ProviderResult<()> {
        let pairs = [
            ("rsvNo", rent_no.to_string()),
            ("payAmt", amount_paid.to_string()),
        ];
        let request = HttpRequest::post_form(self.config.url(CANCEL_PATH), form_body(&pairs));
        let response = session
            .send_and_merge(self.transport.as_ref(), "cancel", request)
            .await?;

        parse_cancel(&response.body)?;
        info!(member_id = %session.member_id(), rent_no, "Booking cancelled");
        Ok(())
    }
}

impl CourtProvider for DobongProvider {
    fn region(&self) -> Region {
        Region::B
    }

    fn fetch_mode(&self) -> FetchMode {
        FetchMode::PerDate
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

    const TABLE: &str = r#"<table><tr><th>코트</th></tr>
        <tr><td>1코트</td><td>06:00 ~ 08:00</td><td>예약가능</td></tr></table>"#;

    fn provider(transport: Arc<ScriptedTransport>) -> DobongProvider {
        DobongProvider::with_transport(
            transport,
            ProviderConfig::new("https://dobong.test/").unwrap(),
            Arc::new(CourtDirectory::builtin()),
        )
    }

    fn session() -> SessionState {
        SessionState::new(Region::B, "lee", CookieJar::new(), AbortHandle::new())
    }

    #[tokio::test]
    async fn one_page_per_facility_and_date() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.route("facCd=CHOAN", HttpResponse::new(200, TABLE));
        transport.route("facCd=DARAK", HttpResponse::new(200, "<table></table>"));
        let provider = provider(transport.clone());
        let date = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();

        let rows = provider.fetch_dates(&session(), &[date]).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].court, "초안산 테니스장");
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].url,
            "https://dobong.test/reserve/timeTable.do?facCd=CHOAN&useDate=20250510"
        );
    }

    #[tokio::test]
    async fn failing_page_fails_the_date() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.route("facCd=CHOAN", HttpResponse::new(200, TABLE));
        transport.route("facCd=DARAK", HttpResponse::new(503, ""));
        let provider = provider(transport);
        let date = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();

        let err = provider.fetch_dates(&session(), &[date]).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ServerError);
        assert_eq!(err.provider(), Some("dobong"));
    }

    #[tokio::test]
    async fn bare_200_cancel_is_success() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(HttpResponse::new(200, ""));
        transport.respond(HttpResponse::new(
            200,
            "<script>alert('이미 취소된 예약입니다.');location.href='/mypage/reserveList.do';</script>",
        ));
        let provider = provider(transport.clone());
        let mut session = session();

        provider.cancel(&mut session, "7001", 6000).await.unwrap();
        let err = provider.cancel(&mut session, "7001", 6000).await.unwrap_err();

        assert_eq!(err.code(), ProviderErrorCode::CancellationRejected);
        assert_eq!(
            transport.requests()[0].body.as_deref(),
            Some("rsvNo=7001&payAmt=6000")
        );
    }

    #[tokio::test]
    async fn finalize_posts_hidden_input_tokens_as_the_form_would() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(HttpResponse::new(
            200,
            r#"<input type="hidden" name="voStr" value="id=7&amp;seq=2">
               <input type="hidden" name="timeStr" value="08:00~10:00+C2">"#,
        ));
        transport.respond(HttpResponse::new(200, r#"{"resultCode": "9001"}"#));
        let provider = provider(transport.clone());
        let mut session = session();
        let date = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let batch = ReservationBatch {
            region: Region::B,
            court_id: "choan-2".into(),
            date,
            facility_code: "CHOAN".into(),
            facility_name: "초안산 테니스장".into(),
            court_label: "2번".into(),
            slots: vec![courtside_core::BatchSlot {
                index: 0,
                request: courtside_core::TimeSlotRequest {
                    court_id: "choan-2".into(),
                    date,
                    start_time: "08:00".parse().unwrap(),
                    end_time: "10:00".parse().unwrap(),
                    provider_court_code: "C2".into(),
                },
            }],
        };

        let confirmed = provider.confirm(&mut session, &batch).await.unwrap();
        let id = provider.finalize(&mut session, &confirmed.tokens).await.unwrap();

        assert_eq!(id, "9001");
        let body = transport.requests()[1].body.clone().unwrap();
        assert_eq!(body, "voStr=id%3D7%26seq%3D2&timeStr=08%3A00~10%3A00%2BC2");
        let fields: Vec<(String, String)> = url::form_urlencoded::parse(body.as_bytes())
            .into_owned()
            .collect();
        assert_eq!(
            fields,
            vec![
                ("voStr".to_string(), "id=7&seq=2".to_string()),
                ("timeStr".to_string(), "08:00~10:00+C2".to_string()),
            ]
        );
    }
}
