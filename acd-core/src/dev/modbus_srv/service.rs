use std::{future, slice, sync::Arc};

use tokio_modbus::{ExceptionCode, Request, Response, SlaveRequest};
use tracing::{debug, warn};

use crate::bank::UnitBank;

/// RTU广播地址, 只执行写请求不应答
const BROADCAST: u8 = 0;

/// 把Modbus请求翻译成对空调状态表的读写
///
/// 协议解析/成帧/传输由tokio-modbus负责, 这里只做地址归一化、
/// 校验和状态表存取. 每条TCP连接持有一个实例, 共享同一张状态表.
#[derive(Clone)]
pub struct AcService {
    id: String,
    bank: Arc<UnitBank>,
}

impl AcService {
    pub fn new(id: String, bank: Arc<UnitBank>) -> Self {
        AcService { id, bank }
    }

    fn dispatch(&self, req: Request<'static>) -> Result<Response, ExceptionCode> {
        match req {
            Request::ReadCoils(addr, cnt) => {
                self.bank.read_coils(addr, cnt).map(Response::ReadCoils)
            }
            Request::ReadDiscreteInputs(addr, cnt) => self
                .bank
                .read_discrete_inputs(addr, cnt)
                .map(Response::ReadDiscreteInputs),
            Request::ReadHoldingRegisters(addr, cnt) => self
                .bank
                .read_holding(addr, cnt)
                .map(Response::ReadHoldingRegisters),
            Request::WriteSingleRegister(addr, value) => self
                .bank
                .write_registers(addr, slice::from_ref(&value))
                .map(|_| {
                    self.log_written(addr, 1);
                    Response::WriteSingleRegister(addr, value)
                }),
            Request::WriteMultipleRegisters(addr, values) => self
                .bank
                .write_registers(addr, &values)
                .map(|_| {
                    self.log_written(addr, values.len());
                    Response::WriteMultipleRegisters(addr, values.len() as u16)
                }),
            Request::WriteSingleCoil(addr, on) => self
                .bank
                .write_coils(addr, slice::from_ref(&on))
                .map(|_| {
                    self.log_written(addr, 1);
                    Response::WriteSingleCoil(addr, on)
                }),
            Request::WriteMultipleCoils(addr, values) => self
                .bank
                .write_coils(addr, &values)
                .map(|_| {
                    self.log_written(addr, values.len());
                    Response::WriteMultipleCoils(addr, values.len() as u16)
                }),
            // FC23先写后读
            Request::ReadWriteMultipleRegisters(read_addr, read_cnt, write_addr, values) => self
                .bank
                .write_registers(write_addr, &values)
                .and_then(|_| {
                    self.log_written(write_addr, values.len());
                    self.bank.read_holding(read_addr, read_cnt)
                })
                .map(Response::ReadWriteMultipleRegisters),
            req => {
                warn!("[{}] 不支持的功能码: {:?}", self.id, req);
                Err(ExceptionCode::IllegalFunction)
            }
        }
    }

    fn log_written(&self, addr: u16, qty: usize) {
        // TODO: 将写入的目标状态下发到空调外机(驱动尚未实现)
        debug!("[{}] 写入已提交: addr={} qty={}", self.id, addr, qty);
    }
}

impl tokio_modbus::server::Service for AcService {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        future::ready(self.dispatch(req))
    }
}

/// RTU从站包装: 只应答发给本站地址的请求, 广播写只执行不应答
pub(super) struct AcSlaveService {
    slave: u8,
    inner: AcService,
}

impl AcSlaveService {
    pub(super) fn new(slave: u8, inner: AcService) -> Self {
        AcSlaveService { slave, inner }
    }
}

impl tokio_modbus::server::Service for AcSlaveService {
    type Request = SlaveRequest<'static>;
    type Response = Option<Response>;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        let SlaveRequest { slave, request } = req;
        if slave != self.slave && slave != BROADCAST {
            return future::ready(Ok(None));
        }
        let res = self.inner.dispatch(request);
        if slave == BROADCAST {
            return future::ready(Ok(None));
        }
        future::ready(res.map(Some))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::unit::{MODE_MAX, TIMER_MAX};
    use tokio_modbus::server::Service;

    fn service() -> AcService {
        AcService::new("test".to_string(), Arc::new(UnitBank::new(4, 10)))
    }

    fn call(svc: &AcService, req: Request<'static>) -> Result<Response, ExceptionCode> {
        svc.call(req).into_inner()
    }

    #[test]
    fn fresh_bank_reads_zeros() {
        let svc = service();
        assert_eq!(
            call(&svc, Request::ReadHoldingRegisters(0, 4)),
            Ok(Response::ReadHoldingRegisters(vec![0, 0, 0, 0]))
        );
        assert_eq!(
            call(&svc, Request::ReadCoils(10, 2)),
            Ok(Response::ReadCoils(vec![false, false]))
        );
        assert_eq!(
            call(&svc, Request::ReadDiscreteInputs(20, 3)),
            Ok(Response::ReadDiscreteInputs(vec![false, false, false]))
        );
    }

    #[test]
    fn write_then_read_registers() {
        let svc = service();
        assert_eq!(
            call(
                &svc,
                Request::WriteMultipleRegisters(10, vec![2, 7, 30, 1].into())
            ),
            Ok(Response::WriteMultipleRegisters(10, 4))
        );
        assert_eq!(
            call(&svc, Request::ReadHoldingRegisters(10, 4)),
            Ok(Response::ReadHoldingRegisters(vec![2, 7, 30, 1]))
        );
    }

    #[test]
    fn write_single_register_and_coil() {
        let svc = service();
        assert_eq!(
            call(&svc, Request::WriteSingleRegister(21, 9)),
            Ok(Response::WriteSingleRegister(21, 9))
        );
        assert_eq!(
            call(&svc, Request::WriteSingleCoil(20, true)),
            Ok(Response::WriteSingleCoil(20, true))
        );
        assert_eq!(
            call(&svc, Request::ReadHoldingRegisters(21, 1)),
            Ok(Response::ReadHoldingRegisters(vec![9]))
        );
        assert_eq!(
            call(&svc, Request::ReadCoils(20, 1)),
            Ok(Response::ReadCoils(vec![true]))
        );
    }

    #[test]
    fn illegal_value_rejected_without_commit() {
        let svc = service();
        assert_eq!(
            call(
                &svc,
                Request::WriteMultipleRegisters(0, vec![MODE_MAX, 0, TIMER_MAX + 1, 0].into())
            ),
            Err(ExceptionCode::IllegalDataValue)
        );
        assert_eq!(
            call(&svc, Request::ReadHoldingRegisters(0, 4)),
            Ok(Response::ReadHoldingRegisters(vec![0, 0, 0, 0]))
        );
    }

    #[test]
    fn address_past_last_unit_rejected() {
        let svc = service();
        assert_eq!(
            call(&svc, Request::ReadHoldingRegisters(40, 1)),
            Err(ExceptionCode::IllegalDataAddress)
        );
        assert_eq!(
            call(&svc, Request::WriteSingleCoil(40, true)),
            Err(ExceptionCode::IllegalDataAddress)
        );
    }

    #[test]
    fn read_write_multiple_registers_writes_first() {
        let svc = service();
        assert_eq!(
            call(
                &svc,
                Request::ReadWriteMultipleRegisters(10, 4, 10, vec![1, 2, 3, 0].into())
            ),
            Ok(Response::ReadWriteMultipleRegisters(vec![1, 2, 3, 0]))
        );
    }

    #[test]
    fn input_registers_are_unmapped() {
        let svc = service();
        assert_eq!(
            call(&svc, Request::ReadInputRegisters(0, 1)),
            Err(ExceptionCode::IllegalFunction)
        );
    }

    #[test]
    fn slave_service_filters_by_station() {
        let svc = AcSlaveService::new(5, service());
        let other = SlaveRequest {
            slave: 3,
            request: Request::ReadHoldingRegisters(0, 1),
        };
        assert_eq!(svc.call(other).into_inner(), Ok(None));

        let own = SlaveRequest {
            slave: 5,
            request: Request::ReadHoldingRegisters(0, 1),
        };
        assert_eq!(
            svc.call(own).into_inner(),
            Ok(Some(Response::ReadHoldingRegisters(vec![0])))
        );
    }

    #[test]
    fn broadcast_write_executes_without_reply() {
        let inner = service();
        let svc = AcSlaveService::new(5, inner.clone());
        let req = SlaveRequest {
            slave: BROADCAST,
            request: Request::WriteSingleRegister(0, 3),
        };
        assert_eq!(svc.call(req).into_inner(), Ok(None));
        assert_eq!(
            call(&inner, Request::ReadHoldingRegisters(0, 1)),
            Ok(Response::ReadHoldingRegisters(vec![3]))
        );
    }
}
