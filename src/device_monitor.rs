//! Win32 backend: a hidden top-level window registered for device interface
//! notifications on every interface class.

use std::cell::Cell;
use std::ffi::c_void;

use tracing::{debug, warn};
use windows::{
    core::{Error, PCWSTR},
    Win32::Foundation::*,
    Win32::System::LibraryLoader::GetModuleHandleW,
    Win32::System::Threading::GetCurrentThreadId,
    Win32::UI::WindowsAndMessaging::*,
};

use crate::backend::{Backend, QuitPoster, Retrieved};
use crate::bridge::EventSignal;
use crate::config::WatchConfig;
use crate::error::NotifyError;

// DEVICE_NOTIFY_ALL_INTERFACE_CLASSES, the filter class GUID is ignored.
const ALL_INTERFACE_CLASSES: u32 = 0x0000_0004;

fn last_error() -> String {
    Error::from_win32().to_string()
}

pub struct Win32Backend {
    class_prefix: String,
}

impl Win32Backend {
    pub fn new(config: &WatchConfig) -> Self {
        Self {
            class_prefix: config.class_prefix.clone(),
        }
    }
}

pub struct Win32Window {
    hwnd: HWND,
    instance: HINSTANCE,
    class_name: Vec<u16>,
    // Read by the window procedure through GWLP_USERDATA.
    signal: Box<EventSignal>,
    destroyed: Cell<bool>,
}

pub struct Win32QuitPoster {
    hwnd: isize,
}

impl QuitPoster for Win32QuitPoster {
    fn post_quit(&self) -> Result<(), String> {
        unsafe { PostMessageW(HWND(self.hwnd), WM_QUIT, WPARAM(0), LPARAM(0)) }
            .map_err(|e| e.to_string())
    }
}

impl Backend for Win32Backend {
    type Window = Win32Window;
    type Registration = HDEVNOTIFY;
    type Message = MSG;
    type Poster = Win32QuitPoster;

    fn current_thread_id(&self) -> u32 {
        unsafe { GetCurrentThreadId() }
    }

    fn create_window(&self, signal: EventSignal) -> Result<Win32Window, NotifyError> {
        let module = unsafe { GetModuleHandleW(None) }.map_err(|e| NotifyError::ClassRegistration {
            message: e.to_string(),
        })?;
        let instance: HINSTANCE = module.into();

        // One class per bound thread so concurrent operations don't collide.
        let class_name: Vec<u16> = format!("{}-{}", self.class_prefix, self.current_thread_id())
            .encode_utf16()
            .chain(Some(0))
            .collect();
        let class = PCWSTR(class_name.as_ptr());

        let wnd_class = WNDCLASSW {
            lpfnWndProc: Some(window_proc),
            hInstance: instance,
            lpszClassName: class,
            ..Default::default()
        };
        if unsafe { RegisterClassW(&wnd_class) } == 0 {
            return Err(NotifyError::ClassRegistration {
                message: last_error(),
            });
        }

        let signal = Box::new(signal);
        let signal_ptr: *const EventSignal = &*signal;
        let hwnd = unsafe {
            CreateWindowExW(
                WS_EX_TOPMOST,
                class,
                class,
                WINDOW_STYLE(0),
                0,
                0,
                0,
                0,
                None,
                None,
                instance,
                Some(signal_ptr as *const c_void),
            )
        };
        if hwnd.0 == 0 {
            let message = last_error();
            if let Err(e) = unsafe { UnregisterClassW(class, instance) } {
                warn!("Failed to unregister window class after creation failure: {}", e);
            }
            return Err(NotifyError::WindowCreation { message });
        }

        debug!("Created notification window {:?}", hwnd);
        Ok(Win32Window {
            hwnd,
            instance,
            class_name,
            signal,
            destroyed: Cell::new(false),
        })
    }

    fn destroy_window(&self, window: &Win32Window) -> Result<(), NotifyError> {
        unsafe { DestroyWindow(window.hwnd) }.map_err(|e| NotifyError::WindowDestruction {
            message: e.to_string(),
        })?;
        window.destroyed.set(true);
        Ok(())
    }

    fn unregister_class(&self, window: Win32Window) -> Result<(), NotifyError> {
        let result = unsafe { UnregisterClassW(PCWSTR(window.class_name.as_ptr()), window.instance) }
            .map_err(|e| NotifyError::ClassUnregistration {
                message: e.to_string(),
            });
        if !window.destroyed.get() {
            // The window procedure may still read the pointer.
            std::mem::forget(window.signal);
        }
        result
    }

    fn register(&self, window: &Win32Window) -> Result<HDEVNOTIFY, NotifyError> {
        let filter = DEV_BROADCAST_DEVICEINTERFACE_W {
            dbcc_size: std::mem::size_of::<DEV_BROADCAST_DEVICEINTERFACE_W>() as u32,
            dbcc_devicetype: DBT_DEVTYP_DEVICEINTERFACE.0,
            ..Default::default()
        };
        let flags = REGISTER_NOTIFICATION_FLAGS(DEVICE_NOTIFY_WINDOW_HANDLE.0 | ALL_INTERFACE_CLASSES);

        unsafe {
            RegisterDeviceNotificationW(
                HANDLE(window.hwnd.0),
                &filter as *const _ as *const c_void,
                flags,
            )
        }
        .map_err(|e| NotifyError::Registration {
            message: e.to_string(),
        })
    }

    fn unregister(&self, registration: HDEVNOTIFY) -> Result<(), NotifyError> {
        unsafe { UnregisterDeviceNotification(registration) }.map_err(|e| NotifyError::Unregistration {
            message: e.to_string(),
        })
    }

    fn next_message(&self, window: &Win32Window) -> Retrieved<MSG> {
        let mut msg = MSG::default();
        // Sent messages such as WM_DEVICECHANGE reach window_proc while this blocks.
        match unsafe { GetMessageW(&mut msg, window.hwnd, WM_QUIT, WM_QUIT) }.0 {
            0 => Retrieved::Quit,
            -1 => Retrieved::Failed(last_error()),
            _ => Retrieved::Message(msg),
        }
    }

    fn dispatch(&self, message: &MSG) {
        unsafe {
            let _ = TranslateMessage(message);
            DispatchMessageW(message);
        }
    }

    fn quit_poster(&self, window: &Win32Window) -> Win32QuitPoster {
        Win32QuitPoster { hwnd: window.hwnd.0 }
    }
}

unsafe extern "system" fn window_proc(
    window: HWND,
    message: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match message {
        WM_NCCREATE => {
            let create = &*(lparam.0 as *const CREATESTRUCTW);
            SetWindowLongPtrW(window, GWLP_USERDATA, create.lpCreateParams as isize);
        }
        WM_DEVICECHANGE => {
            let signal = GetWindowLongPtrW(window, GWLP_USERDATA) as *const EventSignal;
            if let Some(signal) = signal.as_ref() {
                signal.notify();
            }
        }
        WM_NCDESTROY => {
            SetWindowLongPtrW(window, GWLP_USERDATA, 0);
        }
        _ => {}
    }
    DefWindowProcW(window, message, wparam, lparam)
}
